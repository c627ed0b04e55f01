use std::sync::Arc;

use trellis_core::MarkupBuilder;

use crate::render::RenderContext;
use crate::widget::{widget_accessors, Widget, WidgetBase, WidgetKey};

/// Maps the widget's current value (for instance a blob id) to an image URL
pub type UrlProvider = Arc<dyn Fn(&str) -> String + Send + Sync>;

pub struct ImageWidget {
    base: WidgetBase,
    url_provider: Option<UrlProvider>,
    /// Display size in pixels; natural size if `None`
    pub fixed_size: Option<(u32, u32)>,
}

impl ImageWidget {
    pub fn new(id: impl Into<String>, url_provider: Option<UrlProvider>) -> Self {
        Self {
            base: WidgetBase::new(id),
            url_provider,
            fixed_size: None,
        }
    }
}

impl Widget for ImageWidget {
    widget_accessors!("image");

    fn render(&self, key: WidgetKey, cx: &RenderContext<'_>, m: &mut MarkupBuilder) {
        let value = cx.string_value(key);
        let url = match &self.url_provider {
            Some(provider) => provider(&value),
            None => value,
        };

        m.tg_open("div").attr("id", &cx.dom_id(key)).tg_content();
        if url.is_empty() {
            m.tg_open("div class='text-muted'").tg_content();
            m.a("No image");
            m.tg_close();
        } else {
            m.tg_open("img").attr("src", &url).a(" alt='image'");
            match self.fixed_size {
                Some((w, h)) => {
                    m.a(&format!(" width='{w}' height='{h}' class='img-thumbnail'"));
                }
                None => {
                    m.a(" class='img-thumbnail img-fluid'");
                }
            }
            m.tg_close();
        }
        m.tg_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::WidgetTree;

    #[test]
    fn test_url_from_provider() {
        let mut tree = WidgetTree::new();
        let provider: UrlProvider = Arc::new(|blob: &str| {
            if blob.is_empty() {
                String::new()
            } else {
                format!("/r/{blob}.jpg")
            }
        });
        let key = tree.insert(Box::new(ImageWidget::new("photo", Some(provider))), None, None);
        assert!(tree.render_markup(key).contains("No image"));

        tree.state_mut().put("photo", "abc");
        let html = tree.render_markup(key);
        assert!(html.contains("<img src='/r/abc.jpg' alt='image' class='img-thumbnail img-fluid'>"));
    }
}
