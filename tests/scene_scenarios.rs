//! End-to-end scene runs against the in-memory scene graph.

use glowtree::emblem::{AssetState, EmblemLoader, EmblemMesh};
use glowtree::error::AssetError;
use glowtree::falling::EXPIRY_AGE;
use glowtree::prelude::*;

fn params() -> SceneParams {
    SceneParams {
        particle_count: 1000,
        tree_height: 5.0,
        tree_width: 2.0,
        ..SceneParams::default()
    }
}

fn triangle() -> EmblemMesh {
    EmblemMesh::new(
        vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        vec![Vec3::Z; 3],
        vec![0, 1, 2],
    )
    .unwrap()
}

fn scene(loader: EmblemLoader, graph: &mut SceneNodes) -> Scene {
    Scene::new(params(), Box::new(SeededRandom::new(11)), loader, graph).unwrap()
}

#[test]
fn test_first_second_spawns_nine_and_expires_none() {
    let mut graph = SceneNodes::new();
    let mut scene = scene(EmblemLoader::resolved("star.glb", Ok(triangle())), &mut graph);

    let mut spawned = 0;
    let mut expired = 0;
    for _ in 0..60 {
        let report = scene.advance(&mut graph);
        spawned += report.spawned.is_some() as usize;
        expired += report.expired;
    }

    assert_eq!(spawned, 9);
    assert_eq!(expired, 0);
    assert_eq!(graph.count(NodeKind::FallingStar), 9);
}

#[test]
fn test_first_star_is_gone_after_its_lifetime() {
    let mut graph = SceneNodes::new();
    let mut scene = scene(EmblemLoader::resolved("star.glb", Ok(triangle())), &mut graph);

    let first = scene.advance(&mut graph).spawned.unwrap();
    let spawn_time = scene.time();
    while scene.time() - spawn_time <= EXPIRY_AGE {
        assert!(graph.is_attached(first));
        scene.advance(&mut graph);
    }

    assert!(!graph.is_attached(first));
    assert!(scene
        .stars()
        .active()
        .iter()
        .all(|star| scene.time() - star.spawn_time() <= EXPIRY_AGE));
}

#[test]
fn test_regenerating_twice_keeps_one_tree() {
    let mut graph = SceneNodes::new();
    let mut scene = scene(EmblemLoader::resolved("star.glb", Ok(triangle())), &mut graph);
    scene.advance(&mut graph);

    scene.regenerate_tree(&mut graph);
    scene.regenerate_tree(&mut graph);
    scene.update_params(params(), &mut graph).unwrap();

    assert_eq!(graph.count(NodeKind::TreeParticles), 1);
    assert_eq!(graph.handles(NodeKind::TreeParticles), vec![scene.tree().handle()]);
}

#[test]
fn test_tree_split_for_thousand_particles() {
    let mut graph = SceneNodes::new();
    let scene = scene(EmblemLoader::resolved("star.glb", Ok(triangle())), &mut graph);

    let tree = scene.tree().distribution();
    assert_eq!(tree.spiral_count, 700);
    assert_eq!(tree.cone_count(), 300);
    assert!(tree.buffer.positions().iter().all(|p| (0.0..=5.0).contains(&p.y)));
}

#[test]
fn test_burst_waits_for_the_emblem() {
    let mut graph = SceneNodes::new();
    let (tx, loader) = EmblemLoader::channel("star.glb");
    let mut scene = scene(loader, &mut graph);

    for _ in 0..5 {
        assert!(scene.advance(&mut graph).burst_deferred);
    }
    assert_eq!(graph.count(NodeKind::BurstParticles), 0);
    assert!(scene.emblem_state().is_pending());

    tx.send(Ok(triangle())).unwrap();
    let report = scene.advance(&mut graph);

    assert!(!report.burst_deferred);
    assert_eq!(graph.count(NodeKind::Emblem), 1);
    assert_eq!(graph.count(NodeKind::BurstParticles), 1);
    let emblem = scene.emblem().unwrap();
    assert_eq!(scene.burst().unwrap().anchor(), emblem.position());
}

#[test]
fn test_missing_model_keeps_running_without_emblem() {
    let mut graph = SceneNodes::new();
    let mut scene = scene(EmblemLoader::spawn("does/not/exist.glb"), &mut graph);

    // The worker fails fast; give it a moment to report.
    for _ in 0..200 {
        scene.advance(&mut graph);
        if !scene.emblem_state().is_pending() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }

    assert!(matches!(scene.emblem_state(), AssetState::Failed(AssetError::Io { .. })));
    assert_eq!(graph.count(NodeKind::Emblem), 0);
    assert_eq!(graph.count(NodeKind::BurstParticles), 0);
    assert_eq!(graph.count(NodeKind::TreeParticles), 1);
    assert!(graph.count(NodeKind::FallingStar) > 0);
}

#[test]
fn test_teardown_detaches_everything() {
    let mut graph = SceneNodes::new();
    let mut scene = scene(EmblemLoader::resolved("star.glb", Ok(triangle())), &mut graph);
    for _ in 0..100 {
        scene.advance(&mut graph);
    }
    assert!(graph.len() > 3);

    scene.teardown(&mut graph);
    assert!(graph.is_empty());
}

#[test]
fn test_same_seed_same_scene() {
    let mut a = SceneNodes::new();
    let mut b = SceneNodes::new();
    let sa = scene(EmblemLoader::resolved("star.glb", Ok(triangle())), &mut a);
    let sb = scene(EmblemLoader::resolved("star.glb", Ok(triangle())), &mut b);

    assert_eq!(
        sa.tree().buffer().positions(),
        sb.tree().buffer().positions()
    );
}
