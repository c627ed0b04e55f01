//! Page routing
//!
//! A URL path `/name/arg1/arg2` selects the registered [`Page`] called
//! `name`, which validates the remaining segments and, if they make sense
//! for the session's user, yields a [`PageInstance`] that builds the widget
//! tree. Anything that does not resolve falls back to the user's default
//! page.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::path::{PageArgs, PathParse};
use crate::session::SessionState;

/// A kind of page, registered once under a unique name
pub trait Page: Send + Sync {
    fn name(&self) -> &str;

    /// Validate `args` and produce the page, or `None` if they are invalid
    /// or the session may not see it
    ///
    /// Implementations read every argument they accept and end with
    /// [`PageArgs::check_done`].
    fn construct(&self, state: &SessionState, args: &mut PageArgs)
        -> Option<Box<dyn PageInstance>>;
}

/// A page with concrete arguments
pub trait PageInstance: Send {
    fn name(&self) -> &str;

    fn args(&self) -> Vec<String> {
        Vec::new()
    }

    /// (Re)build the session's widget tree
    fn generate(&self, state: &mut SessionState);

    /// The path that leads back to this page, e.g. `/animal/17/edit`
    fn path(&self) -> String {
        let mut path = format!("/{}", self.name());
        for arg in self.args() {
            path.push('/');
            path.push_str(&arg);
        }
        path
    }
}

/// Application hooks the router needs
pub trait PageDelegate: Send + Sync {
    type User;

    fn user_for_session(&self, state: &SessionState) -> Self::User;

    /// Name of the page a user lands on when nothing else applies
    fn default_page_for_user(&self, user: &Self::User) -> String;
}

/// Registry of pages and the routing between them
pub struct PageRequester<D: PageDelegate> {
    delegate: D,
    pages: FxHashMap<String, Arc<dyn Page>>,
}

impl<D: PageDelegate> PageRequester<D> {
    pub fn new(delegate: D) -> Self {
        Self {
            delegate,
            pages: FxHashMap::default(),
        }
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    /// Register a page
    ///
    /// # Panics
    ///
    /// If a page with the same name is already registered.
    pub fn register(&mut self, page: impl Page + 'static) {
        let name = page.name().to_string();
        assert!(
            !self.pages.contains_key(&name),
            "page '{name}' registered twice"
        );
        tracing::debug!(page = %name, "registered page");
        self.pages.insert(name, Arc::new(page));
    }

    pub fn page_with_name(&self, name: &str) -> Option<&dyn Page> {
        self.pages.get(name).map(|page| page.as_ref())
    }

    pub fn is_page(&self, name: &str) -> bool {
        self.pages.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Route `path` for a session, build the resulting page and record its
    /// path as the browser location
    ///
    /// An empty path or unknown name selects the user's default page. If
    /// the selected page rejects its arguments, the default page is built
    /// with no arguments instead.
    ///
    /// # Panics
    ///
    /// If the default page is not registered or rejects empty arguments.
    pub fn process(&self, state: &mut SessionState, path: &str) -> Box<dyn PageInstance> {
        let mut parse = PathParse::new(path);
        let user = self.delegate.user_for_session(state);
        let default_name = self.delegate.default_page_for_user(&user);

        let requested = parse.read();
        let page = match self.page_with_name(&requested) {
            Some(page) => page,
            None => {
                if !requested.is_empty() {
                    tracing::debug!(page = %requested, "unknown page; using default");
                }
                self.default_page(&default_name)
            }
        };

        let mut args = PageArgs::new(parse.remaining_args());
        let instance = page
            .construct(state, &mut args)
            .filter(|_| args.done() && !args.problem());
        let instance = match instance {
            Some(instance) => instance,
            None => {
                tracing::debug!(page = page.name(), %args, "page rejected arguments; using default");
                self.default_page(&default_name)
                    .construct(state, &mut PageArgs::default())
                    .unwrap_or_else(|| {
                        panic!("default page '{default_name}' rejected empty arguments")
                    })
            }
        };

        instance.generate(state);
        state.set_browser_path(instance.path());
        instance
    }

    fn default_page(&self, name: &str) -> &dyn Page {
        self.page_with_name(name)
            .unwrap_or_else(|| panic!("default page '{name}' is not registered"))
    }
}
