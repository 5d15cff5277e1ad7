pub(crate) mod color;
pub(crate) mod fonts;
pub(crate) mod image;
pub(crate) mod text;
