//! Demo application: a widget gallery, an animal feed and animal pages

mod animal;
mod feed;
mod gallery;
mod zoo;

use std::sync::Arc;

use trellis_session::{
    BlobCache, PageDelegate, PageRequester, Session, SessionState, BLOB_URL_PREFIX,
};

use crate::server::{Resource, TrellisServer};

use animal::AnimalPage;
use feed::FeedPage;
use gallery::{GalleryPage, GALLERY};
use zoo::{UploadStore, Zoo};

/// Everyone is a visitor; visitors start at the gallery
pub struct DemoDelegate;

impl PageDelegate for DemoDelegate {
    type User = ();

    fn user_for_session(&self, _: &SessionState) {}

    fn default_page_for_user(&self, _: &()) -> String {
        GALLERY.to_string()
    }
}

pub struct DemoApp {
    zoo: Arc<Zoo>,
    uploads: Arc<UploadStore>,
    blobs: Arc<BlobCache>,
}

impl DemoApp {
    pub fn new(blob_cache_capacity: usize) -> Self {
        let uploads = Arc::new(UploadStore::default());
        let blobs = Arc::new(BlobCache::new(Arc::clone(&uploads), blob_cache_capacity));
        Self {
            zoo: Arc::new(Zoo::sample()),
            uploads,
            blobs,
        }
    }

    pub fn page_requester(&self) -> PageRequester<DemoDelegate> {
        let mut pages = PageRequester::new(DemoDelegate);
        pages.register(GalleryPage {
            uploads: Arc::clone(&self.uploads),
            blobs: Arc::clone(&self.blobs),
        });
        pages.register(FeedPage {
            zoo: Arc::clone(&self.zoo),
        });
        pages.register(AnimalPage {
            zoo: Arc::clone(&self.zoo),
        });
        pages
    }

    /// Serve uploaded images under the blob URL prefix
    pub fn install_resources(&self, server: &mut TrellisServer<DemoDelegate>) {
        let blobs = Arc::clone(&self.blobs);
        server.add_resource_handler(
            BLOB_URL_PREFIX,
            Arc::new(move |_: &Session, name: &str| {
                let blob = blobs.blob_with_name(name)?;
                Some(Resource::named(&blob.name, blob.data.clone()))
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_session::AjaxRequest;

    fn on_page(app: &DemoApp, path: &str) -> Session {
        let session = Session::new("demo");
        {
            let mut state = session.lock();
            app.page_requester().process(&mut state, path);
            state.tree.clear_dirty();
        }
        session
    }

    #[test]
    fn test_gallery_refuses_parrots() {
        let app = DemoApp::new(4);
        let session = on_page(&app, "/");
        assert_eq!(session.lock().page_name(), Some(GALLERY));

        let patch = session.handle_ajax(&AjaxRequest::widget("bird").with_value("sparrow"));
        assert_eq!(patch.ids().collect::<Vec<_>>(), vec!["bird"]);

        let patch = session.handle_ajax(&AjaxRequest::widget("bird").with_value("parrot"));
        assert!(patch.get("bird").unwrap().contains("No parrots, please!"));

        let patch = session.handle_ajax(&AjaxRequest::widget("clear"));
        assert!(!patch.get("bird").unwrap().contains("No parrots"));
        assert_eq!(session.lock().tree.str_value("bird"), "");
    }

    #[test]
    fn test_zebra_announces_in_alert() {
        let app = DemoApp::new(4);
        let session = on_page(&app, "/gallery");
        let patch = session.handle_ajax(&AjaxRequest::widget("zebra").with_value("hello"));
        assert!(patch.get("message").unwrap().contains("The zebra says: hello"));
        assert!(patch.contains("zebra"));
    }

    #[test]
    fn test_upload_shows_image() {
        let app = DemoApp::new(4);
        let session = on_page(&app, "/gallery");
        let patch = session.handle_upload("photo", Ok(&b"\x89PNG\r\n\x1a\nrest"[..]), 1024);
        assert!(patch.get("photo_image").unwrap().contains("src='/r/upload1.png'"));

        let patch = session.handle_upload("photo", Ok(&b"not an image"[..]), 1024);
        assert!(patch.get("photo").unwrap().contains("Please choose a PNG"));

        let patch = session.handle_upload("photo", Ok(&[0u8; 2048][..]), 1024);
        assert!(patch.get("photo").unwrap().contains("too big"));
    }

    #[test]
    fn test_feed_like_button() {
        let app = DemoApp::new(4);
        let session = on_page(&app, "/feed");

        let patch = session.handle_ajax(&AjaxRequest::widget("animals:3:like"));
        assert_eq!(app.zoo.get(3).unwrap().likes, 1);
        assert!(patch.get("feed_message").unwrap().contains("You like the Cheetah"));
        assert!(patch.get("animals").unwrap().contains("1 like"));

        let patch = session.handle_ajax(&AjaxRequest::widget("animals:page:2"));
        assert!(patch.get("animals").unwrap().contains("Meerkat"));
    }

    #[test]
    fn test_animal_pages() {
        let app = DemoApp::new(4);
        let session = on_page(&app, "/animal/5");
        assert_eq!(session.lock().browser_path(), Some("/animal/5"));
        assert_eq!(session.lock().tree.str_value("animal_name"), "Elephant");

        let session = on_page(&app, "/animal/5/edit");
        let patch = session.handle_ajax(&AjaxRequest::widget("animal_name").with_value(""));
        assert!(patch.get("animal_name").unwrap().contains("Please enter a name"));
        session.handle_ajax(&AjaxRequest::widget("animal_name").with_value("Mammoth"));
        assert_eq!(app.zoo.get(5).unwrap().name, "Mammoth");

        for path in ["/animal/0", "/animal/500", "/animal/5/delete"] {
            let session = on_page(&app, path);
            assert_eq!(session.lock().browser_path(), Some("/gallery"), "path {path}");
        }
    }

    #[test]
    fn test_blob_resource_handler() {
        let app = DemoApp::new(4);
        let blob = app.uploads.insert_image(b"GIF89a.").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config = trellis_session::ServerConfig::testing().with_resources_dir(dir.path());
        let mut server = TrellisServer::new(
            config,
            Arc::new(trellis_session::InMemorySessionManager::new()),
            app.page_requester(),
        )
        .unwrap();
        app.install_resources(&mut server);

        let session = Session::new("s");
        match server.serve_path(&session, &format!("/r/{}", blob.name)) {
            crate::server::Reply::Resource(resource) => {
                assert_eq!(resource.content_type, "image/gif");
                assert_eq!(resource.data, b"GIF89a.");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
