//! Protobuf messages of the Mapbox Vector Tile format, version 2.1.
//!
//! Hand-written `prost` derives equivalent to what `prost-build` emits for
//! `vector_tile.proto`, so the crate needs no build script.

/// A vector tile: an ordered list of named layers.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Tile {
    #[prost(message, repeated, tag = "3")]
    pub layers: Vec<tile::Layer>,
}

pub mod tile {
    /// Geometry type of a feature.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum GeomType {
        Unknown = 0,
        Point = 1,
        Linestring = 2,
        Polygon = 3,
    }

    /// A tag value. Exactly one field is set.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Value {
        #[prost(string, optional, tag = "1")]
        pub string_value: Option<String>,
        #[prost(float, optional, tag = "2")]
        pub float_value: Option<f32>,
        #[prost(double, optional, tag = "3")]
        pub double_value: Option<f64>,
        #[prost(int64, optional, tag = "4")]
        pub int_value: Option<i64>,
        #[prost(uint64, optional, tag = "5")]
        pub uint_value: Option<u64>,
        #[prost(sint64, optional, tag = "6")]
        pub sint_value: Option<i64>,
        #[prost(bool, optional, tag = "7")]
        pub bool_value: Option<bool>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Feature {
        #[prost(uint64, optional, tag = "1", default = "0")]
        pub id: Option<u64>,
        /// Pairs of indexes into the layer's `keys` and `values`.
        #[prost(uint32, repeated, tag = "2", packed = "true")]
        pub tags: Vec<u32>,
        #[prost(enumeration = "GeomType", optional, tag = "3", default = "Unknown")]
        pub r#type: Option<i32>,
        /// Command-encoded geometry.
        #[prost(uint32, repeated, tag = "4", packed = "true")]
        pub geometry: Vec<u32>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Layer {
        #[prost(uint32, required, tag = "15", default = "1")]
        pub version: u32,
        #[prost(string, required, tag = "1")]
        pub name: String,
        #[prost(message, repeated, tag = "2")]
        pub features: Vec<Feature>,
        #[prost(string, repeated, tag = "3")]
        pub keys: Vec<String>,
        #[prost(message, repeated, tag = "4")]
        pub values: Vec<Value>,
        #[prost(uint32, optional, tag = "5", default = "4096")]
        pub extent: Option<u32>,
    }
}
