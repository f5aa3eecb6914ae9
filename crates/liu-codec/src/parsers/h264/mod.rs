//! H.264/AVC 裸流帧定界器.
//!
//! 针对 Annex B 格式的基本流 (elementary stream), 提供:
//! - 访问单元边界检测 (跨调用可恢复的状态机)
//! - 跨调用帧重组 (任意分片的输入重组为完整帧)
//! - 首个 slice header 的部分 Exp-Golomb 解码 (图像类型/关键帧/场帧结构/时序提示)
//! - 参数集前导数据 ("extradata") 与首个访问单元的分界扫描
//!
//! 不做的事情: 宏块级熵解码、畸形码流修复 (跳过并继续除外)、多流调度
//! (一个 [`H264Framer`] 实例只服务一条流).

mod assembler;
mod framer;
mod golomb;
pub mod nal;
mod scanner;
mod sei;
mod split;
#[cfg(test)]
mod test_bits;

pub mod pps;
pub mod sps;

pub use framer::{
    H264Framer, MAX_PPS_COUNT, MAX_SPS_COUNT, ParameterSetCache, ParseOutput, PictureInfo,
    PictureStructure, PictureType,
};
pub use nal::{NalHeader, NalUnitType, unescape_rbsp};
pub use pps::{Pps, parse_pps};
pub use split::find_config_boundary;
pub use sps::{Sps, parse_sps};
