//! One animal, at `/animal/<id>` or `/animal/<id>/edit`

use std::sync::Arc;

use trellis_session::{Page, PageArgs, PageInstance, SessionState};
use trellis_widgets::WidgetSize;

use super::zoo::{likes_text, Zoo};

pub const ANIMAL: &str = "animal";

pub struct AnimalPage {
    pub zoo: Arc<Zoo>,
}

impl Page for AnimalPage {
    fn name(&self) -> &str {
        ANIMAL
    }

    fn construct(&self, _: &SessionState, args: &mut PageArgs) -> Option<Box<dyn PageInstance>> {
        let id = args.positive_int();
        let edit = args.read_if("edit");
        if !args.check_done() {
            return None;
        }
        self.zoo.get(id)?;
        Some(Box::new(AnimalDetail {
            zoo: Arc::clone(&self.zoo),
            id,
            edit,
        }))
    }
}

struct AnimalDetail {
    zoo: Arc<Zoo>,
    id: i64,
    edit: bool,
}

impl PageInstance for AnimalDetail {
    fn name(&self) -> &str {
        ANIMAL
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec![self.id.to_string()];
        if self.edit {
            args.push("edit".to_string());
        }
        args
    }

    fn generate(&self, state: &mut SessionState) {
        // The record may have gone since the page was constructed
        let Some(animal) = self.zoo.get(self.id) else {
            state.build_page(ANIMAL, |m| {
                m.label("This animal is no longer here").add_heading();
            });
            return;
        };

        let values = state.state_mut();
        values.put("animal_name", animal.name.as_str());
        values.put("animal_summary", animal.summary.as_str());
        values.put("animal_likes", likes_text(animal.likes));

        let id = self.id;
        let edit = self.edit;
        let zoo = Arc::clone(&self.zoo);
        state.build_page(ANIMAL, |m| {
            if !edit {
                m.id("animal_name").size(WidgetSize::Large).add_heading();
                m.id("animal_summary").add_text();
                m.id("animal_likes").add_text();
                return;
            }
            m.label(format!("Editing animal {id}")).size(WidgetSize::Medium).add_heading();
            let names = Arc::clone(&zoo);
            m.id("animal_name").label("Name").add_input(move |_, _, value| names.rename(id, value));
            m.id("animal_summary")
                .label("Summary")
                .add_input(move |_, _, value| zoo.set_summary(id, value));
        });
    }
}
