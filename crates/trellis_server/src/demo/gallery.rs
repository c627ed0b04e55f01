//! A page showing one of each widget

use std::sync::Arc;

use trellis_session::{BlobCache, Page, PageArgs, PageInstance, SessionState};
use trellis_widgets::{
    AlertClass, AlertWidget, UrlProvider, WidgetEvent, WidgetSize, WidgetTree,
};

use super::zoo::UploadStore;

pub const GALLERY: &str = "gallery";

const STORY: &str = "A zebra walked into a bar.\n\nThe bartender said: we have a drink named after you.\nThe zebra said: you have a drink called Steve?";

/// Refuses parrots, accepts any other bird
pub fn validate_bird(_: &mut WidgetTree, _: &WidgetEvent, value: &str) -> Result<String, String> {
    if value.trim().eq_ignore_ascii_case("parrot") {
        Err("No parrots, please!".to_string())
    } else {
        Ok(value.to_string())
    }
}

fn announce(tree: &mut WidgetTree, message: String) {
    tree.state_mut().put("message", message);
    tree.repaint_id("message");
}

pub struct GalleryPage {
    pub uploads: Arc<UploadStore>,
    pub blobs: Arc<BlobCache>,
}

impl Page for GalleryPage {
    fn name(&self) -> &str {
        GALLERY
    }

    fn construct(&self, _: &SessionState, args: &mut PageArgs) -> Option<Box<dyn PageInstance>> {
        if !args.check_done() {
            return None;
        }
        Some(Box::new(Gallery {
            uploads: Arc::clone(&self.uploads),
            blobs: Arc::clone(&self.blobs),
        }))
    }
}

struct Gallery {
    uploads: Arc<UploadStore>,
    blobs: Arc<BlobCache>,
}

impl PageInstance for Gallery {
    fn name(&self) -> &str {
        GALLERY
    }

    fn generate(&self, state: &mut SessionState) {
        let values = state.state_mut();
        if !values.contains("message") {
            values.put("message", "Welcome to the widget gallery");
        }
        values.put("story", STORY);

        let uploads = Arc::clone(&self.uploads);
        let blobs = Arc::clone(&self.blobs);
        let image_url: UrlProvider = Arc::new(move |value: &str| match value.parse::<i64>() {
            Ok(id) => blobs.blob_url(id),
            Err(_) => String::new(),
        });

        state.build_page(GALLERY, |m| {
            m.id("message").add_alert(AlertClass::Info);
            m.label("Widget gallery").size(WidgetSize::Large).add_heading();

            m.col(6);
            m.id("bird").label("Bird").add_input(validate_bird);
            m.id("zebra").label("Zebra").add_input(|tree, _, value| {
                announce(tree, format!("The zebra says: {value}"));
                Ok(value.to_string())
            });
            m.id("fast").label("Go fast").add_checkbox(|tree, _, checked| {
                let speed = if checked { "fast" } else { "slow" };
                announce(tree, format!("Going {speed}"));
                Ok(checked)
            });
            m.id("lights").label("Lights").add_switch(|_, _, on| Ok(on));
            m.id("cycle").label("Change alert").add_button(|tree, _| {
                let key = tree.get("message");
                if let Some(alert) = tree.widget_as_mut::<AlertWidget>(key) {
                    alert.class = alert.class.next();
                }
                tree.repaint(key);
            });
            m.id("clear").label("Clear bird").size(WidgetSize::Small).add_button(|tree, _| {
                let key = tree.get("bird");
                if tree.write_value(key, "".into()) {
                    tree.repaint(key);
                }
                tree.clear_widget_problem(key);
            });

            m.col(12);
            m.id("story").add_text();

            m.col(6);
            m.id("photo").label("Photo").add_file_upload(move |tree, _, bytes| {
                let blob = uploads.insert_image(bytes)?;
                tree.state_mut().put("photo_image", blob.id);
                tree.repaint_id("photo_image");
                Ok(())
            });
            m.id("photo_image").add_image(Some(image_url));
        });
    }
}
