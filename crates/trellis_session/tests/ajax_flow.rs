//! End-to-end request handling against a session

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use trellis_core::{StateMap, StateProvider};
use trellis_session::{
    AjaxRequest, InMemorySessionManager, Page, PageArgs, PageDelegate, PageInstance,
    PageRequester, Session, SessionManager, SessionState,
};
use trellis_widgets::{BasicList, WidgetTree};

fn bird_page(state: &mut SessionState) {
    state.build_page("birds", |m| {
        m.id("bird").label("Bird").add_input(|_, _, value| {
            if value == "parrot" {
                Err("No parrots, please!".to_string())
            } else {
                Ok(value.to_string())
            }
        });
        m.id("feed").add_text();
    });
    state.tree.clear_dirty();
}

#[test]
fn test_bird_input_accepts_and_rejects() {
    let manager = InMemorySessionManager::new();
    let session = manager.create_session();
    bird_page(&mut session.lock());

    let patch = session.handle_ajax(&AjaxRequest::widget("bird").with_value("sparrow"));
    assert_eq!(patch.ids().collect::<Vec<_>>(), vec!["bird"]);
    assert!(patch.get("bird").unwrap().contains("value='sparrow'"));
    assert_eq!(session.lock().tree.str_value("bird"), "sparrow");

    let patch = session.handle_ajax(&AjaxRequest::widget("bird").with_value("parrot"));
    let html = patch.get("bird").unwrap();
    assert!(html.contains("No parrots, please!"));
    assert!(html.contains("is-invalid"));
    assert_eq!(session.lock().state().opt_string("bird.problem", ""), "No parrots, please!");

    // The problem clears once an acceptable value arrives
    let patch = session.handle_ajax(&AjaxRequest::widget("bird").with_value("owl"));
    assert!(!patch.get("bird").unwrap().contains("No parrots"));
    let state = session.lock();
    assert!(state.tree.problem(state.tree.get("bird")).is_none());
}

#[test]
fn test_unchanged_value_sends_nothing() {
    let session = Session::new("s");
    bird_page(&mut session.lock());
    session.handle_ajax(&AjaxRequest::widget("bird").with_value("wren"));
    let patch = session.handle_ajax(&AjaxRequest::widget("bird").with_value("wren"));
    assert!(patch.is_empty());
}

#[test]
fn test_widget_without_listener_is_a_request_problem() {
    let session = Session::new("s");
    bird_page(&mut session.lock());
    let patch = session.handle_ajax(&AjaxRequest::widget("feed").with_value("x"));
    assert!(patch.is_empty());
    assert_eq!(session.lock().state().opt_string("feed", ""), "");
}

#[test]
fn test_requests_on_one_session_do_not_interleave() {
    let session = Arc::new(Session::new("s"));
    let in_flight = Arc::new(AtomicBool::new(false));
    {
        let in_flight = Arc::clone(&in_flight);
        session.lock().build_page("slow", move |m| {
            m.id("count").add_text();
            m.id("slow").label("Slow").add_button(move |tree: &mut WidgetTree, _| {
                assert!(!in_flight.swap(true, Ordering::SeqCst), "requests overlapped");
                thread::sleep(Duration::from_millis(20));
                let n = tree.int_value("count") + 1;
                tree.state_mut().put("count", n);
                tree.repaint_id("count");
                in_flight.store(false, Ordering::SeqCst);
            });
        });
    }

    let workers: Vec<_> = (0..2)
        .map(|_| {
            let session = Arc::clone(&session);
            thread::spawn(move || session.handle_ajax(&AjaxRequest::widget("slow")))
        })
        .collect();
    for worker in workers {
        let patch = worker.join().unwrap();
        assert!(patch.contains("count"));
    }
    assert_eq!(session.lock().state().opt_int("count", 0), 2);
}

fn animal_list() -> BasicList {
    BasicList::new((1..=7).collect(), 3).with_items(|id| {
        let mut state = StateMap::new();
        state.put("name", format!("Animal {id}"));
        StateProvider::new("", state)
    })
}

fn list_page(state: &mut SessionState) {
    state.build_page("feed", |m| {
        m.id("animals").open_list(animal_list());
        m.col(4);
        m.id("card").open();
        m.id("name").add_text();
        m.id("like").label("Like").add_button(|tree: &mut WidgetTree, event| {
            let liked = event.element.unwrap_or(-1);
            tree.state_mut().put("liked", liked);
            tree.repaint_id("last");
        });
        m.close();
        m.close();
        m.id("last").add_text();
    });
    state.tree.clear_dirty();
}

#[test]
fn test_list_paging_through_ajax() {
    let session = Session::new("s");
    list_page(&mut session.lock());

    let patch = session.handle_ajax(&AjaxRequest::widget("animals:page:2"));
    assert_eq!(patch.ids().collect::<Vec<_>>(), vec!["animals"]);
    let html = patch.get("animals").unwrap();
    assert!(html.contains("Animal 7"));
    assert!(!html.contains("Animal 1<"));

    // Out of range pages are rejected without a patch
    assert!(session.handle_ajax(&AjaxRequest::widget("animals:page:3")).is_empty());
}

#[test]
fn test_list_item_button_receives_element() {
    let session = Session::new("s");
    list_page(&mut session.lock());

    let patch = session.handle_ajax(&AjaxRequest::widget("animals:2:like"));
    assert_eq!(session.lock().state().opt_int("liked", 0), 2);
    assert!(patch.contains("last"));

    assert!(session.handle_ajax(&AjaxRequest::widget("animals:2:unknown")).is_empty());
}

// =============================================================================
// Routing
// =============================================================================

struct Landing;

impl Page for Landing {
    fn name(&self) -> &str {
        "landing"
    }

    fn construct(&self, _: &SessionState, args: &mut PageArgs) -> Option<Box<dyn PageInstance>> {
        args.check_done().then(|| Box::new(LandingInstance) as Box<dyn PageInstance>)
    }
}

struct LandingInstance;

impl PageInstance for LandingInstance {
    fn name(&self) -> &str {
        "landing"
    }

    fn generate(&self, state: &mut SessionState) {
        bird_page(state);
    }
}

struct Visitors;

impl PageDelegate for Visitors {
    type User = String;

    fn user_for_session(&self, _: &SessionState) -> String {
        "guest".to_string()
    }

    fn default_page_for_user(&self, user: &String) -> String {
        assert_eq!(user, "guest");
        "landing".to_string()
    }
}

#[test]
fn test_unknown_path_builds_default_page() {
    let mut requester = PageRequester::new(Visitors);
    requester.register(Landing);
    let session = Session::new("s");
    let mut state = session.lock();
    let page = requester.process(&mut state, "/missing/1");
    assert_eq!(page.name(), "landing");
    assert_eq!(state.browser_path(), Some("/landing"));
    assert!(state.tree.find("bird").is_some());
}
