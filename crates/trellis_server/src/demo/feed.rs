//! The animal feed: every animal as a card, a page at a time

use std::sync::Arc;

use trellis_session::{Page, PageArgs, PageInstance, SessionState};
use trellis_widgets::{WidgetSize, WidgetTree};

use super::zoo::Zoo;

pub const FEED: &str = "feed";

const CARDS_PER_PAGE: usize = 6;

pub struct FeedPage {
    pub zoo: Arc<Zoo>,
}

impl Page for FeedPage {
    fn name(&self) -> &str {
        FEED
    }

    fn construct(&self, _: &SessionState, args: &mut PageArgs) -> Option<Box<dyn PageInstance>> {
        args.check_done().then(|| {
            Box::new(Feed {
                zoo: Arc::clone(&self.zoo),
            }) as Box<dyn PageInstance>
        })
    }
}

struct Feed {
    zoo: Arc<Zoo>,
}

impl PageInstance for Feed {
    fn name(&self) -> &str {
        FEED
    }

    fn generate(&self, state: &mut SessionState) {
        let zoo = Arc::clone(&self.zoo);
        state.build_page(FEED, |m| {
            m.label("Animals").size(WidgetSize::Large).add_heading();
            m.id("feed_message").add_text();

            m.id("animals").open_list(self.zoo.list(CARDS_PER_PAGE));
            m.col(4);
            m.id("card").open();
            m.id("name").size(WidgetSize::Small).add_heading();
            m.id("summary").add_text();
            m.id("likes").add_text();
            m.id("like").label("Like").size(WidgetSize::Small).add_button(
                move |tree: &mut WidgetTree, event| {
                    let Some(animal) = event.element.and_then(|id| zoo.like(id)) else {
                        return;
                    };
                    tree.state_mut()
                        .put("feed_message", format!("You like the {}", animal.name));
                    tree.repaint_id("feed_message");
                    tree.repaint_id("animals");
                },
            );
            m.close();
            m.close();
        });
    }
}
