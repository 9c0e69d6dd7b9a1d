//! Canvas geometry and tool-scoped hit testing.

use std::str::FromStr;

use kurbo::{Point, Rect};
use strum::EnumString;

use folio_types::BlockId;

/// Layout queries answered by the rendering layer.
///
/// Points and rects are in canvas (model) coordinates.
pub trait GeometryService {
    /// The container (note) under `point`, if any.
    fn hit_test_container(&self, point: Point) -> Option<BlockId>;

    /// The block inside `container` nearest to `point`.
    fn closest_block_in_container(&self, point: Point, container: &BlockId) -> Option<BlockId>;

    /// Bounding rect of a rendered block.
    fn block_rect(&self, block: &BlockId) -> Option<Rect>;
}

/// Active canvas tool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, EnumString)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum EdgelessTool {
    /// Selection.
    #[default]
    Default,
    Pan,
    Shape,
    Brush,
    Text,
}

impl EdgelessTool {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgelessTool::Default => "default",
            EdgelessTool::Pan => "pan",
            EdgelessTool::Shape => "shape",
            EdgelessTool::Brush => "brush",
            EdgelessTool::Text => "text",
        }
    }

    /// Whether block hit testing applies under this tool.
    pub fn hit_tests_blocks(&self) -> bool {
        matches!(self, EdgelessTool::Default)
    }
}

impl std::fmt::Display for EdgelessTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The block under `point`, resolved through its container.
///
/// Returns `None` outside the selection tool or when no container is hovered.
pub fn closest_block<G: GeometryService + ?Sized>(
    tool: EdgelessTool,
    point: Point,
    geometry: &G,
) -> Option<BlockId> {
    if !tool.hit_tests_blocks() {
        return None;
    }
    let container = geometry.hit_test_container(point)?;
    geometry.closest_block_in_container(point, &container)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One container holding one block, both at fixed rects.
    struct OneNote;

    impl GeometryService for OneNote {
        fn hit_test_container(&self, point: Point) -> Option<BlockId> {
            Rect::new(0.0, 0.0, 100.0, 100.0)
                .contains(point)
                .then(|| BlockId::from("note"))
        }

        fn closest_block_in_container(&self, _point: Point, container: &BlockId) -> Option<BlockId> {
            (container.as_str() == "note").then(|| BlockId::from("para"))
        }

        fn block_rect(&self, _block: &BlockId) -> Option<Rect> {
            None
        }
    }

    #[test]
    fn test_hit_test_in_default_tool() {
        let hit = closest_block(EdgelessTool::Default, Point::new(10.0, 10.0), &OneNote);
        assert_eq!(hit, Some(BlockId::from("para")));
    }

    #[test]
    fn test_outside_any_container() {
        assert_eq!(
            closest_block(EdgelessTool::Default, Point::new(500.0, 10.0), &OneNote),
            None
        );
    }

    #[test]
    fn test_other_tools_never_hit() {
        for tool in [
            EdgelessTool::Pan,
            EdgelessTool::Shape,
            EdgelessTool::Brush,
            EdgelessTool::Text,
        ] {
            assert_eq!(closest_block(tool, Point::new(10.0, 10.0), &OneNote), None);
        }
    }

    #[test]
    fn test_tool_names() {
        assert_eq!(EdgelessTool::from_str("brush"), Some(EdgelessTool::Brush));
        assert_eq!(EdgelessTool::from_str("DEFAULT"), Some(EdgelessTool::Default));
        assert_eq!(EdgelessTool::from_str("lasso"), None);
        assert_eq!(EdgelessTool::Pan.to_string(), "pan");
    }
}
