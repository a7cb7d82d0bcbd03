//! Every WGSL module the renderer compiles must parse and validate.

use glowtree::gpu::shaders::{all_modules, PointShader};

fn validate_wgsl(code: &str) -> Result<naga::Module, String> {
    let module = naga::front::wgsl::parse_str(code)
        .map_err(|e| format!("WGSL parse error: {}", e.emit_to_string(code)))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::empty(),
    );
    validator
        .validate(&module)
        .map_err(|e| format!("WGSL validation error: {:?}", e))?;

    Ok(module)
}

fn entry_points(module: &naga::Module) -> Vec<&str> {
    module.entry_points.iter().map(|ep| ep.name.as_str()).collect()
}

#[test]
fn test_all_modules_validate() {
    for (label, source) in all_modules() {
        if let Err(err) = validate_wgsl(&source) {
            panic!("{label}: {err}");
        }
    }
}

#[test]
fn test_point_shaders_expose_vertex_and_fragment() {
    for kind in PointShader::ALL {
        let module = validate_wgsl(&kind.source()).unwrap();
        let names = entry_points(&module);
        assert!(names.contains(&"vs_main"), "{kind:?}: {names:?}");
        assert!(names.contains(&"fs_main"), "{kind:?}: {names:?}");
    }
}

#[test]
fn test_bloom_module_has_both_fragment_stages() {
    let module = validate_wgsl(glowtree::gpu::shaders::BLOOM).unwrap();
    let names = entry_points(&module);
    for expected in ["vs_main", "fs_bright", "fs_blur"] {
        assert!(names.contains(&expected), "missing {expected}: {names:?}");
    }
}
