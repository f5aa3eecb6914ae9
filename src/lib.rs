//! # Liu (流)
//!
//! 纯 Rust 实现的 H.264 裸流帧定界器, 对标 FFmpeg 的 h264 parser.
//!
//! Liu 面向硬解/转封装管线中的基本流整形环节: 输入是任意分片的
//! Annex B 字节流, 输出是逐访问单元的完整帧与图像元数据
//! (类型、关键帧、帧/场结构、时序提示), 全程不做熵解码.
//!
//! # 快速开始
//!
//! ```rust
//! use liu::codec::parsers::h264::H264Framer;
//!
//! let mut framer = H264Framer::new();
//! let mut input: &[u8] = &[];
//! while !input.is_empty() {
//!     let out = framer.parse(input).unwrap();
//!     if let Some(frame) = out.frame {
//!         println!("访问单元: {} 字节, 元数据: {:?}", frame.len(), out.picture);
//!     }
//!     input = &input[out.consumed..];
//! }
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `liu-core` | 核心类型与工具 (错误、位读取) |
//! | `liu-codec` | H.264 帧定界与图像分类 |

/// 核心类型与工具 (对标 libavutil)
pub use liu_core as core;

/// 码流解析器 (对标 libavcodec parser 层)
pub use liu_codec as codec;
