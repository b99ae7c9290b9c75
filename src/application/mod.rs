//! Application services: front matter parsing, rendering, linting and the
//! site build that ties them together.

pub mod error;
pub mod frontmatter;
pub mod lint;
pub mod render;
pub mod site;
pub mod sitemap;
pub mod syndication;
