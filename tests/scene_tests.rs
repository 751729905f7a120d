//! Scene graph lifecycle through the public API

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tilescape::core::{
    Behavior, BoxFuture, InitContext, Node, NodeBuilder, Scene, SceneError, SimpleRng, UpdateContext,
};
use tilescape::types::InputState;

type Log = Arc<Mutex<Vec<String>>>;

struct Recorder {
    name: &'static str,
    log: Log,
}

impl Recorder {
    fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: Arc::clone(log),
        }
    }

    fn push(&self, event: &str) {
        self.log.lock().unwrap().push(format!("{}:{event}", self.name));
    }
}

impl Behavior for Recorder {
    fn on_init<'a>(&'a mut self, _ctx: &'a InitContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.push("init");
            Ok(())
        })
    }

    fn on_update(&mut self, _node: &mut Node, _ctx: &mut UpdateContext<'_>) {
        self.push("update");
    }

    fn on_destroy(&mut self, _node: &mut Node, payload: Option<&Value>) {
        match payload {
            Some(p) => self.push(&format!("destroy {p}")),
            None => self.push("destroy"),
        }
    }
}

fn take(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.lock().unwrap())
}

fn run_update(scene: &mut Scene, root: tilescape::core::NodeHandle) {
    let input = InputState::new();
    let mut rng = SimpleRng::new(1);
    let mut ctx = UpdateContext::new(0.016, 16.0, &input, &mut rng);
    scene.update(root, &mut ctx);
}

#[tokio::test]
async fn test_init_waits_for_whole_subtree() {
    let log = Log::default();
    let mut scene = Scene::new();
    let root = scene.create(NodeBuilder::new().with_id("root").with_behavior(Recorder::new("root", &log)));
    let a = scene.create(NodeBuilder::new().with_id("a").with_behavior(Recorder::new("a", &log)));
    let b = scene.create(NodeBuilder::new().with_id("b").with_behavior(Recorder::new("b", &log)));
    let leaf = scene.create(NodeBuilder::new().with_id("leaf").with_behavior(Recorder::new("leaf", &log)));

    scene.add_child(a, leaf, None).await.unwrap();
    scene.add_child(root, a, None).await.unwrap();
    scene.add_child(root, b, None).await.unwrap();
    assert!(take(&log).is_empty(), "nothing initializes before the root does");

    scene.init(root).await.unwrap();
    let events = take(&log);
    assert_eq!(events.first().map(String::as_str), Some("root:init"));
    assert_eq!(events.len(), 4);
    for h in [root, a, b, leaf] {
        let node = scene.get(h).unwrap();
        assert!(node.is_initialized() && node.is_enabled());
    }

    // Second init is rejected.
    assert!(matches!(scene.init(root).await, Err(SceneError::AlreadyInitialized(_))));
}

#[tokio::test]
async fn test_late_child_initializes_on_attach() {
    let log = Log::default();
    let mut scene = Scene::new();
    let root = scene.create(NodeBuilder::new());
    scene.init(root).await.unwrap();

    let late = scene.create(NodeBuilder::new().with_behavior(Recorder::new("late", &log)));
    scene.add_child(root, late, None).await.unwrap();
    assert_eq!(take(&log), vec!["late:init"]);
    assert!(scene.get(late).unwrap().is_initialized());
}

#[tokio::test]
async fn test_update_visits_children_in_order() {
    let log = Log::default();
    let mut scene = Scene::new();
    let root = scene.create(NodeBuilder::new().with_behavior(Recorder::new("root", &log)));
    let high = scene.create(NodeBuilder::new().with_behavior(Recorder::new("high", &log)));
    let low = scene.create(NodeBuilder::new().with_behavior(Recorder::new("low", &log)));
    let same = scene.create(NodeBuilder::new().with_behavior(Recorder::new("same", &log)));

    scene.add_child(root, high, Some(5)).await.unwrap();
    scene.add_child(root, low, Some(1)).await.unwrap();
    scene.add_child(root, same, Some(5)).await.unwrap();
    scene.init(root).await.unwrap();
    take(&log);

    run_update(&mut scene, root);
    assert_eq!(
        take(&log),
        vec!["low:update", "high:update", "same:update", "root:update"]
    );
}

#[tokio::test]
async fn test_destroy_is_not_recursive_but_remove_child_is() {
    let log = Log::default();
    let mut scene = Scene::new();
    let root = scene.create(NodeBuilder::new());
    let parent = scene.create(NodeBuilder::new().with_id("parent").with_behavior(Recorder::new("parent", &log)));
    let child = scene.create(NodeBuilder::new().with_behavior(Recorder::new("child", &log)));
    scene.add_child(parent, child, None).await.unwrap();
    scene.add_child(root, parent, None).await.unwrap();
    scene.init(root).await.unwrap();
    take(&log);

    scene.destroy(parent, Some(json!({"reason": "test"}))).unwrap();
    assert_eq!(take(&log), vec![r#"parent:destroy {"reason":"test"}"#]);
    assert!(scene.get(parent).unwrap().is_destroyed());
    assert!(!scene.get(child).unwrap().is_destroyed());

    // Destroying twice is harmless.
    scene.destroy(parent, None).unwrap();
    assert!(take(&log).is_empty());

    assert!(scene.remove_child(root, parent).unwrap());
    assert_eq!(take(&log), vec!["child:destroy"]);
    assert!(scene.children(root).is_empty());
}

#[tokio::test]
async fn test_attach_rules() {
    let mut scene = Scene::new();
    let root = scene.create(NodeBuilder::new().with_id("root"));
    let child = scene.create(NodeBuilder::new().with_id("child"));
    scene.add_child(root, child, None).await.unwrap();

    assert!(matches!(
        scene.add_child(root, child, None).await,
        Err(SceneError::AlreadyAttached(_))
    ));
    let orphan = scene.create(NodeBuilder::new());
    assert!(matches!(
        scene.add_child(child, root, None).await,
        Err(SceneError::Cycle(_))
    ));

    scene.destroy(orphan, None).unwrap();
    assert!(matches!(
        scene.add_child(root, orphan, None).await,
        Err(SceneError::Destroyed(_))
    ));
    assert_eq!(scene.find_child_by_id(root, "child", false), Some(child));
}
