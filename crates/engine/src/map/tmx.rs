use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapParseError {
    #[error("malformed map XML at {location}: {message}")]
    Malformed {
        message: String,
        location: SourceLocation,
    },
    #[error("root element must be <map>, found <{found}> at {location}")]
    InvalidRoot {
        found: String,
        location: SourceLocation,
    },
    #[error("<{element}> is missing attribute '{attribute}' at {location}")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
        location: SourceLocation,
    },
    #[error("<{element}> attribute '{attribute}' has invalid value '{value}' at {location}")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
        location: SourceLocation,
    },
    #[error("tiles must be square, found {tile_width}x{tile_height}")]
    NonSquareTiles { tile_width: u32, tile_height: u32 },
    #[error("layer '{layer}' uses unsupported data encoding '{encoding}' at {location}")]
    UnsupportedEncoding {
        layer: String,
        encoding: String,
        location: SourceLocation,
    },
    #[error("layer '{layer}' cell {index} is not a valid cell code: '{token}' at {location}")]
    InvalidCellToken {
        layer: String,
        index: usize,
        token: String,
        location: SourceLocation,
    },
    #[error("layer '{layer}' has {actual} cells, expected {expected} at {location}")]
    CellCountMismatch {
        layer: String,
        expected: usize,
        actual: usize,
        location: SourceLocation,
    },
}

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("failed to read map {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse map {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: MapParseError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub name: String,
    /// Row-major raw cell codes, `width * height` long.
    pub cells: Vec<u32>,
}

/// A `<tileset>` reference as written in the map file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesetRef {
    pub first_id: u32,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMap {
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    /// Paint order, bottom first.
    pub layers: Vec<Layer>,
    pub tileset_refs: Vec<TilesetRef>,
}

impl TileMap {
    pub fn pixel_width(&self) -> u32 {
        self.width * self.tile_size
    }

    pub fn pixel_height(&self) -> u32 {
        self.height * self.tile_size
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    pub fn cell(&self, layer: &Layer, col: u32, row: u32) -> Option<u32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        layer
            .cells
            .get(row as usize * self.width as usize + col as usize)
            .copied()
    }
}

pub fn read_tile_map(path: &Path) -> Result<TileMap, MapLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| MapLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_tile_map(&raw).map_err(|source| MapLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_tile_map(raw: &str) -> Result<TileMap, MapParseError> {
    let doc = Document::parse(raw).map_err(|error| MapParseError::Malformed {
        message: error.to_string(),
        location: SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        },
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "map" {
        return Err(MapParseError::InvalidRoot {
            found: root.tag_name().name().to_string(),
            location: location_of(&doc, root),
        });
    }
    if root.attribute("infinite") == Some("1") {
        return Err(MapParseError::InvalidAttribute {
            element: "map",
            attribute: "infinite",
            value: "1".to_string(),
            location: location_of(&doc, root),
        });
    }

    let width = required_u32(&doc, root, "map", "width")?;
    let height = required_u32(&doc, root, "map", "height")?;
    let tile_width = required_u32(&doc, root, "map", "tilewidth")?;
    let tile_height = required_u32(&doc, root, "map", "tileheight")?;
    if tile_width != tile_height {
        return Err(MapParseError::NonSquareTiles {
            tile_width,
            tile_height,
        });
    }
    if tile_width == 0 {
        return Err(MapParseError::InvalidAttribute {
            element: "map",
            attribute: "tilewidth",
            value: "0".to_string(),
            location: location_of(&doc, root),
        });
    }
    // Pixel extents must fit in u32.
    for (attribute, cells) in [("width", width), ("height", height)] {
        if cells.checked_mul(tile_width).is_none() {
            return Err(MapParseError::InvalidAttribute {
                element: "map",
                attribute,
                value: cells.to_string(),
                location: location_of(&doc, root),
            });
        }
    }

    let mut tileset_refs = Vec::new();
    for node in root.children().filter(|node| node.has_tag_name("tileset")) {
        tileset_refs.push(TilesetRef {
            first_id: required_u32(&doc, node, "tileset", "firstgid")?,
            source: node.attribute("source").map(ToString::to_string),
        });
    }

    let expected_cells = width as usize * height as usize;
    let mut layers = Vec::new();
    // Layers nested in <group> elements keep document order.
    for node in root.descendants().filter(|node| node.has_tag_name("layer")) {
        layers.push(parse_layer(&doc, node, expected_cells)?);
    }

    Ok(TileMap {
        width,
        height,
        tile_size: tile_width,
        layers,
        tileset_refs,
    })
}

fn parse_layer(
    doc: &Document<'_>,
    node: Node<'_, '_>,
    expected_cells: usize,
) -> Result<Layer, MapParseError> {
    let name = node
        .attribute("name")
        .ok_or_else(|| MapParseError::MissingAttribute {
            element: "layer",
            attribute: "name",
            location: location_of(doc, node),
        })?
        .to_string();

    let Some(data) = node.children().find(|child| child.has_tag_name("data")) else {
        return Err(MapParseError::CellCountMismatch {
            layer: name,
            expected: expected_cells,
            actual: 0,
            location: location_of(doc, node),
        });
    };
    if let Some(compression) = data.attribute("compression") {
        return Err(MapParseError::UnsupportedEncoding {
            layer: name,
            encoding: format!("compression={compression}"),
            location: location_of(doc, data),
        });
    }

    let cells = match data.attribute("encoding") {
        Some("csv") => parse_csv_cells(doc, data, &name)?,
        None => parse_tile_elements(doc, data, &name)?,
        Some(other) => {
            return Err(MapParseError::UnsupportedEncoding {
                layer: name,
                encoding: other.to_string(),
                location: location_of(doc, data),
            })
        }
    };

    if cells.len() != expected_cells {
        return Err(MapParseError::CellCountMismatch {
            layer: name,
            expected: expected_cells,
            actual: cells.len(),
            location: location_of(doc, data),
        });
    }

    Ok(Layer { name, cells })
}

fn parse_csv_cells(
    doc: &Document<'_>,
    data: Node<'_, '_>,
    layer: &str,
) -> Result<Vec<u32>, MapParseError> {
    let text = data.text().unwrap_or_default();
    text.split(|ch: char| ch == ',' || ch.is_whitespace())
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(index, token)| {
            token
                .parse::<u32>()
                .map_err(|_| MapParseError::InvalidCellToken {
                    layer: layer.to_string(),
                    index,
                    token: token.to_string(),
                    location: location_of(doc, data),
                })
        })
        .collect()
}

fn parse_tile_elements(
    doc: &Document<'_>,
    data: Node<'_, '_>,
    layer: &str,
) -> Result<Vec<u32>, MapParseError> {
    data.children()
        .filter(|child| child.has_tag_name("tile"))
        .enumerate()
        .map(|(index, tile)| match tile.attribute("gid") {
            None => Ok(0),
            Some(value) => value
                .parse::<u32>()
                .map_err(|_| MapParseError::InvalidCellToken {
                    layer: layer.to_string(),
                    index,
                    token: value.to_string(),
                    location: location_of(doc, tile),
                }),
        })
        .collect()
}

fn required_u32(
    doc: &Document<'_>,
    node: Node<'_, '_>,
    element: &'static str,
    attribute: &'static str,
) -> Result<u32, MapParseError> {
    let value = node
        .attribute(attribute)
        .ok_or_else(|| MapParseError::MissingAttribute {
            element,
            attribute,
            location: location_of(doc, node),
        })?;
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| MapParseError::InvalidAttribute {
            element,
            attribute,
            value: value.to_string(),
            location: location_of(doc, node),
        })
}

fn location_of(doc: &Document<'_>, node: Node<'_, '_>) -> SourceLocation {
    let pos = doc.text_pos_at(node.range().start);
    SourceLocation {
        line: pos.row as usize,
        column: pos.col as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="3" height="2" tilewidth="16" tileheight="16">
 <tileset firstgid="1" source="fl.tsx"/>
 <tileset firstgid="2049" source="floor.tsx"/>
 <layer id="1" name="floor" width="3" height="2">
  <data encoding="csv">
1,2,3,
2147483653,0,6
</data>
 </layer>
 <group id="5" name="furniture">
  <layer id="2" name="table" width="3" height="2">
   <data encoding="csv">0,0,0,0,7,0</data>
  </layer>
 </group>
</map>
"#;

    #[test]
    fn parses_layers_in_document_order_including_groups() {
        let map = parse_tile_map(SMALL_MAP).expect("parse");
        assert_eq!((map.width, map.height, map.tile_size), (3, 2, 16));
        assert_eq!((map.pixel_width(), map.pixel_height()), (48, 32));
        let names = map.layers.iter().map(|l| l.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["floor", "table"]);

        let floor = map.layer("floor").expect("floor layer");
        assert_eq!(floor.cells, vec![1, 2, 3, 0x8000_0005, 0, 6]);
        assert_eq!(map.cell(floor, 0, 1), Some(0x8000_0005));
        assert_eq!(map.cell(floor, 3, 0), None);

        assert_eq!(map.tileset_refs.len(), 2);
        assert_eq!(map.tileset_refs[1].first_id, 2049);
        assert_eq!(map.tileset_refs[1].source.as_deref(), Some("floor.tsx"));
    }

    #[test]
    fn wrong_cell_count_names_the_layer() {
        let raw = r#"<map width="2" height="2" tilewidth="16" tileheight="16">
<layer name="walk"><data encoding="csv">1,2,3</data></layer></map>"#;
        let error = parse_tile_map(raw).expect_err("count mismatch");
        match error {
            MapParseError::CellCountMismatch {
                layer,
                expected,
                actual,
                ..
            } => {
                assert_eq!(layer, "walk");
                assert_eq!((expected, actual), (4, 3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_numeric_token_is_rejected() {
        let raw = r#"<map width="2" height="1" tilewidth="16" tileheight="16">
<layer name="base"><data encoding="csv">1,x</data></layer></map>"#;
        let error = parse_tile_map(raw).expect_err("bad token");
        assert!(matches!(
            error,
            MapParseError::InvalidCellToken { index: 1, ref token, .. } if token == "x"
        ));
    }

    #[test]
    fn malformed_xml_reports_location() {
        let error = parse_tile_map("<map width=\"1\"").expect_err("malformed");
        let MapParseError::Malformed { location, .. } = error else {
            panic!("expected malformed error");
        };
        assert_eq!(location.line, 1);
    }

    #[test]
    fn missing_dimension_attribute_is_reported() {
        let raw = r#"<map height="1" tilewidth="16" tileheight="16"/>"#;
        assert!(matches!(
            parse_tile_map(raw),
            Err(MapParseError::MissingAttribute {
                element: "map",
                attribute: "width",
                ..
            })
        ));
    }

    #[test]
    fn base64_data_is_unsupported() {
        let raw = r#"<map width="1" height="1" tilewidth="16" tileheight="16">
<layer name="a"><data encoding="base64">AQAAAA==</data></layer></map>"#;
        assert!(matches!(
            parse_tile_map(raw),
            Err(MapParseError::UnsupportedEncoding { .. })
        ));
    }

    #[test]
    fn xml_tile_elements_are_accepted() {
        let raw = r#"<map width="2" height="1" tilewidth="8" tileheight="8">
<layer name="a"><data><tile gid="4"/><tile/></data></layer></map>"#;
        let map = parse_tile_map(raw).expect("parse");
        assert_eq!(map.layers[0].cells, vec![4, 0]);
    }

    #[test]
    fn pixel_extent_overflow_is_rejected_at_parse_time() {
        let raw = r#"<map width="2" height="1" tilewidth="4294967295" tileheight="4294967295">
<layer name="a"><data encoding="csv">0,0</data></layer></map>"#;
        assert!(matches!(
            parse_tile_map(raw),
            Err(MapParseError::InvalidAttribute {
                element: "map",
                attribute: "width",
                ref value,
                ..
            }) if value == "2"
        ));
    }

    #[test]
    fn rectangular_tiles_are_rejected() {
        let raw = r#"<map width="1" height="1" tilewidth="16" tileheight="8"/>"#;
        assert_eq!(
            parse_tile_map(raw),
            Err(MapParseError::NonSquareTiles {
                tile_width: 16,
                tile_height: 8
            })
        );
    }
}
