//! The demonstrations wired into the scene host.

mod grid;
mod multi_view;
mod tree;

pub use grid::GridScene;
pub use multi_view::MultiViewScene;
pub use tree::TreeScene;

use std::collections::HashMap;

use crate::loader::{ResourceRequest, asset_path};

/// Logical name of the flat color shader every scene uses.
pub(crate) const COLOR_SHADER: &str = "color.wgsl";

/// The shared resource declaration: the flat color shader from `assets/`.
pub(crate) fn color_shader_request() -> HashMap<String, ResourceRequest> {
    let mut requests = HashMap::new();
    requests.insert(
        COLOR_SHADER.to_string(),
        ResourceRequest::text(asset_path(COLOR_SHADER)),
    );
    requests
}
