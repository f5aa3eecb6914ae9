//! # liu-codec
//!
//! Liu 框架码流解析器库, 提供 H.264 裸流的帧定界与图像分类能力.
//!
//! 本 crate 承担 FFmpeg libavcodec parser 层的角色: 从连续 (可能任意分片)
//! 的字节流中定位访问单元边界, 跨调用重组完整帧, 并通过部分解码首个
//! slice header 得到图像元数据, 全程不进行熵解码.
//!
//! ## 使用示例
//!
//! ```rust
//! use liu_codec::parsers::h264::H264Framer;
//!
//! // 逐分片送入码流; 每当一个访问单元完整时, frame 字段返回其字节范围.
//! let mut framer = H264Framer::new();
//! let chunk = [0x00, 0x00, 0x01, 0x41, 0x9A];
//! let out = framer.parse(&chunk).unwrap();
//! assert!(out.frame.is_none()); // 单个访问单元尚未结束
//! assert_eq!(out.consumed, chunk.len());
//! ```

pub mod parsers;

// 重导出常用类型
pub use parsers::h264::{
    H264Framer, NalUnitType, ParameterSetCache, ParseOutput, PictureInfo, PictureStructure,
    PictureType, find_config_boundary,
};
