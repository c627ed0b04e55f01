//! Concrete widget kinds

mod alert;
mod button;
mod checkbox;
mod container;
mod file_upload;
mod heading;
mod image;
mod input;
mod list;
mod text;

pub use alert::{AlertClass, AlertWidget};
pub use button::ButtonWidget;
pub use checkbox::CheckboxWidget;
pub use container::ContainerWidget;
pub use file_upload::{FileUploadWidget, UploadListener};
pub use heading::HeadingWidget;
pub use image::{ImageWidget, UrlProvider};
pub use input::InputWidget;
pub use list::{BasicList, ListSource, ListWidget};
pub use text::TextWidget;
