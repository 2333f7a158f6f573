pub mod responses;
pub mod seo_form;
