mod tmx;

pub use tmx::{
    parse_tile_map, read_tile_map, Layer, MapLoadError, MapParseError, SourceLocation, TileMap,
    TilesetRef,
};
