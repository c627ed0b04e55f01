use std::sync::Arc;

use trellis_core::MarkupBuilder;

use crate::render::RenderContext;
use crate::tree::WidgetTree;
use crate::widget::{widget_accessors, Widget, WidgetBase, WidgetEvent, WidgetKey};

/// Receives uploaded bytes; an `Err` is shown as the widget's problem
pub type UploadListener =
    Arc<dyn Fn(&mut WidgetTree, &WidgetEvent, &[u8]) -> Result<(), String> + Send + Sync>;

/// A file picker that posts the chosen file to the upload endpoint
pub struct FileUploadWidget {
    base: WidgetBase,
    label: Option<String>,
    upload: UploadListener,
}

impl FileUploadWidget {
    pub fn new<F>(id: impl Into<String>, label: Option<String>, upload: F) -> Self
    where
        F: Fn(&mut WidgetTree, &WidgetEvent, &[u8]) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            base: WidgetBase::new(id),
            label,
            upload: Arc::new(upload),
        }
    }

    pub fn upload_listener(&self) -> UploadListener {
        self.upload.clone()
    }

    /// Name of the form field carrying the file
    pub fn input_name(id: &str) -> String {
        format!("{id}.input")
    }
}

impl Widget for FileUploadWidget {
    widget_accessors!("file_upload");

    fn render(&self, key: WidgetKey, cx: &RenderContext<'_>, m: &mut MarkupBuilder) {
        let dom_id = cx.dom_id(key);
        let input_id = Self::input_name(&dom_id);

        m.tg_open("div").attr("id", &dom_id).a(" class='mb-3'").tg_content();
        m.tg_open("form")
            .attr("id", &format!("{dom_id}.form"))
            .a(" enctype='multipart/form-data' method='post'")
            .tg_content();
        if let Some(label) = &self.label {
            m.tg_open("label")
                .attr("for", &input_id)
                .a(" class='form-label'")
                .style("font-size:70%")
                .tg_content();
            m.escape(label);
            m.tg_close();
        }
        m.tg_open("input class='form-control' type='file'")
            .attr("name", &input_id)
            .attr("id", &input_id);
        if !self.base.enabled {
            m.a(" disabled");
        }
        m.a(&format!(" onchange='jsUpload(\"{dom_id}\")'"));
        m.tg_close();
        if let Some(problem) = cx.problem(key) {
            m.tg_open("div class='form-text text-danger'")
                .style("font-size:70%")
                .tg_content();
            m.escape(&problem);
            m.tg_close();
        }
        m.tg_close();
        m.tg_close();
    }
}
