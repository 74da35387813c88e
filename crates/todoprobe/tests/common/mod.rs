//! In-memory TodoMVC for driving the real page objects and runner without a
//! browser.
//!
//! The fake renders the same markup contract as the real application: rows
//! under `.todo-list li` filtered by the route, a counter and filter links
//! that only exist while the list is non-empty, delete buttons that only
//! show on hover, and storage that survives a reload.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use todoprobe::driver::{BrowserSession, ContextSession, Launcher, PageDriver};
use todoprobe::{
    selectors, BrowserKind, ContextOptions, ElementState, LaunchOptions, Locator, ProbeError,
    ProbeResult,
};

/// PNG signature, enough for artifact plumbing
pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

static VIDEOS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    All,
    Active,
    Completed,
}

impl Route {
    fn from_url(url: &str) -> Self {
        if url.ends_with("#/active") {
            Self::Active
        } else if url.ends_with("#/completed") {
            Self::Completed
        } else {
            Self::All
        }
    }

    const fn fragment(self) -> &'static str {
        match self {
            Self::All => "#/",
            Self::Active => "#/active",
            Self::Completed => "#/completed",
        }
    }

    const fn shows(self, completed: bool) -> bool {
        match self {
            Self::All => true,
            Self::Active => !completed,
            Self::Completed => completed,
        }
    }
}

#[derive(Debug, Clone)]
struct Todo {
    text: String,
    completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Input,
    List,
    Row(usize),
    Toggle(usize),
    Destroy(usize),
    Counter,
    ClearCompleted,
    FilterLink(Route),
    ToggleAll,
}

#[derive(Debug, Clone)]
struct Node {
    target: Target,
    state: ElementState,
}

/// Storage shared by the pages of one context
#[derive(Debug, Default)]
struct Store {
    todos: Vec<Todo>,
}

#[derive(Debug)]
struct View {
    url: String,
    loaded: bool,
    input: String,
    hovered: Option<usize>,
}

/// Launcher producing fake TodoMVC pages
#[derive(Debug, Clone, Default)]
pub struct FakeTodoLauncher {
    fail_launch: bool,
}

impl FakeTodoLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every launch fails
    pub fn failing() -> Self {
        Self { fail_launch: true }
    }
}

#[async_trait]
impl Launcher for FakeTodoLauncher {
    fn name(&self) -> &'static str {
        "fake-todomvc"
    }

    async fn launch(
        &self,
        kind: BrowserKind,
        _options: &LaunchOptions,
    ) -> ProbeResult<Box<dyn BrowserSession>> {
        if self.fail_launch {
            return Err(ProbeError::BrowserLaunch {
                message: "fake launch failure".into(),
            });
        }
        if !kind.speaks_cdp() {
            return Err(ProbeError::UnsupportedBrowser {
                kind: kind.to_string(),
                backend: "fake-todomvc",
            });
        }
        Ok(Box::new(FakeBrowser))
    }
}

struct FakeBrowser;

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn new_context(&self, options: &ContextOptions) -> ProbeResult<Box<dyn ContextSession>> {
        let video = options.record_video_dir.as_ref().map(|dir| {
            let n = VIDEOS.fetch_add(1, Ordering::SeqCst);
            dir.join(format!("fake-{}-{n}.webm", std::process::id()))
        });
        Ok(Box::new(FakeContext {
            store: Arc::new(Mutex::new(Store::default())),
            video,
        }))
    }

    async fn close(&self) -> ProbeResult<()> {
        Ok(())
    }
}

struct FakeContext {
    store: Arc<Mutex<Store>>,
    video: Option<PathBuf>,
}

#[async_trait]
impl ContextSession for FakeContext {
    async fn new_page(&self) -> ProbeResult<Arc<dyn PageDriver>> {
        Ok(Arc::new(FakePage {
            store: Arc::clone(&self.store),
            view: Mutex::new(View {
                url: "about:blank".into(),
                loaded: false,
                input: String::new(),
                hovered: None,
            }),
        }))
    }

    fn video_path(&self) -> Option<PathBuf> {
        self.video.clone()
    }

    async fn close(&self) -> ProbeResult<()> {
        if let Some(path) = &self.video {
            std::fs::create_dir_all(path.parent().unwrap_or(path.as_path()))?;
            std::fs::write(path, b"webm")?;
        }
        Ok(())
    }
}

/// One fake tab
pub struct FakePage {
    store: Arc<Mutex<Store>>,
    view: Mutex<View>,
}

fn visible(text: impl Into<String>) -> ElementState {
    ElementState {
        text: text.into(),
        visible: true,
        ..ElementState::default()
    }
}

fn normalize(css: &str) -> String {
    css.replace('\'', "\"")
}

impl FakePage {
    fn with_state<T>(&self, f: impl FnOnce(&mut Store, &mut View) -> T) -> T {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut store, &mut view)
    }

    fn render(store: &Store, view: &View, css: &str) -> Vec<Node> {
        if !view.loaded {
            return Vec::new();
        }
        let route = Route::from_url(&view.url);
        let has_todos = !store.todos.is_empty();
        let css = normalize(css);
        let node = |target, state| vec![Node { target, state }];

        match css.as_str() {
            selectors::NEW_TODO => node(Target::Input, visible("")),
            selectors::TODO_LIST => node(Target::List, visible("")),
            selectors::TODO_ITEM => store
                .todos
                .iter()
                .enumerate()
                .filter(|(_, t)| route.shows(t.completed))
                .map(|(i, t)| {
                    let mut state = visible(format!(" {} ", t.text));
                    if t.completed {
                        state.classes.push(selectors::COMPLETED_CLASS.into());
                    }
                    Node {
                        target: Target::Row(i),
                        state,
                    }
                })
                .collect(),
            selectors::TODO_COUNT if has_todos => {
                let left = store.todos.iter().filter(|t| !t.completed).count();
                let noun = if left == 1 { "item" } else { "items" };
                node(Target::Counter, visible(format!("{left} {noun} left")))
            }
            selectors::CLEAR_COMPLETED if store.todos.iter().any(|t| t.completed) => {
                node(Target::ClearCompleted, visible("Clear completed"))
            }
            selectors::FILTER_ALL if has_todos => node(Target::FilterLink(Route::All), visible("All")),
            selectors::FILTER_ACTIVE if has_todos => {
                node(Target::FilterLink(Route::Active), visible("Active"))
            }
            selectors::FILTER_COMPLETED if has_todos => {
                node(Target::FilterLink(Route::Completed), visible("Completed"))
            }
            selectors::TOGGLE_ALL if has_todos => {
                let mut state = visible("");
                state.checked = store.todos.iter().all(|t| t.completed);
                node(Target::ToggleAll, state)
            }
            _ => Vec::new(),
        }
    }

    fn descend(store: &Store, view: &View, parent: &Node, css: &str) -> Option<Node> {
        let Target::Row(i) = parent.target else {
            return None;
        };
        match normalize(css).as_str() {
            selectors::ROW_TOGGLE => {
                let mut state = visible("");
                state.checked = store.todos.get(i).is_some_and(|t| t.completed);
                Some(Node {
                    target: Target::Toggle(i),
                    state,
                })
            }
            selectors::ROW_DESTROY => Some(Node {
                target: Target::Destroy(i),
                state: ElementState {
                    visible: view.hovered == Some(i),
                    ..ElementState::default()
                },
            }),
            _ => None,
        }
    }

    fn resolve(store: &Store, view: &View, locator: &Locator) -> Vec<Node> {
        let mut nodes = Self::render(store, view, locator.selector().css());
        if let Some(text) = locator.selector().text() {
            nodes.retain(|n| n.state.text.trim() == text);
        }
        if let Some(n) = locator.index() {
            nodes = nodes.into_iter().skip(n).take(1).collect();
        }
        if let Some(css) = locator.descendant() {
            nodes = nodes
                .iter()
                .filter_map(|n| Self::descend(store, view, n, css))
                .collect();
        }
        nodes
    }

    fn first(store: &Store, view: &View, locator: &Locator) -> ProbeResult<Node> {
        Self::resolve(store, view, locator)
            .into_iter()
            .next()
            .ok_or_else(|| ProbeError::ElementNotFound {
                locator: locator.to_string(),
            })
    }

    fn base_url(url: &str) -> &str {
        url.split('#').next().unwrap_or(url)
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        self.with_state(|_, view| {
            view.url = url.to_string();
            view.loaded = true;
            view.input.clear();
            view.hovered = None;
        });
        Ok(())
    }

    async fn reload(&self) -> ProbeResult<()> {
        self.with_state(|_, view| {
            view.input.clear();
            view.hovered = None;
        });
        Ok(())
    }

    async fn url(&self) -> ProbeResult<String> {
        Ok(self.with_state(|_, view| view.url.clone()))
    }

    async fn title(&self) -> ProbeResult<String> {
        Ok("React • TodoMVC".to_string())
    }

    async fn query_all(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>> {
        Ok(self.with_state(|store, view| {
            Self::resolve(store, view, locator)
                .into_iter()
                .map(|n| n.state)
                .collect()
        }))
    }

    async fn click(&self, locator: &Locator) -> ProbeResult<()> {
        self.with_state(|store, view| {
            let node = Self::first(store, view, locator)?;
            if !node.state.visible {
                return Err(ProbeError::page(format!("{locator} is not visible")));
            }
            match node.target {
                Target::Toggle(i) => {
                    if let Some(todo) = store.todos.get_mut(i) {
                        todo.completed = !todo.completed;
                    }
                }
                Target::Destroy(i) => {
                    store.todos.remove(i);
                    view.hovered = None;
                }
                Target::ClearCompleted => store.todos.retain(|t| !t.completed),
                Target::FilterLink(route) => {
                    view.url = format!("{}{}", Self::base_url(&view.url), route.fragment());
                }
                Target::ToggleAll => {
                    let all = store.todos.iter().all(|t| t.completed);
                    for todo in &mut store.todos {
                        todo.completed = !all;
                    }
                }
                Target::Input | Target::List | Target::Row(_) | Target::Counter => {}
            }
            Ok(())
        })
    }

    async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()> {
        self.with_state(|store, view| {
            let node = Self::first(store, view, locator)?;
            if node.target != Target::Input {
                return Err(ProbeError::page(format!("{locator} is not an input")));
            }
            view.input = value.to_string();
            Ok(())
        })
    }

    async fn press(&self, locator: &Locator, key: &str) -> ProbeResult<()> {
        self.with_state(|store, view| {
            let node = Self::first(store, view, locator)?;
            if node.target == Target::Input && key == "Enter" {
                let text = view.input.trim().to_string();
                if !text.is_empty() {
                    store.todos.push(Todo {
                        text,
                        completed: false,
                    });
                }
                view.input.clear();
            }
            Ok(())
        })
    }

    async fn hover(&self, locator: &Locator) -> ProbeResult<()> {
        self.with_state(|store, view| {
            let node = Self::first(store, view, locator)?;
            view.hovered = match node.target {
                Target::Row(i) => Some(i),
                _ => None,
            };
            Ok(())
        })
    }

    async fn screenshot(&self, _full_page: bool) -> ProbeResult<Vec<u8>> {
        Ok(FAKE_PNG.to_vec())
    }

    async fn close(&self) -> ProbeResult<()> {
        Ok(())
    }
}
