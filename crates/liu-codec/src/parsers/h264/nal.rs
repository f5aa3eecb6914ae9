//! H.264 NAL (Network Abstraction Layer) 单元工具.
//!
//! # Annex B 格式
//!
//! Annex B 使用起始码 (start code) 分隔 NAL 单元:
//! - 3 字节起始码: `00 00 01`
//! - 4 字节起始码: `00 00 00 01`
//!
//! # NAL 头部 (1 字节)
//! ```text
//! ┌─────────────────────────────────────┐
//! │ forbidden(1) | ref_idc(2) | type(5) │
//! └─────────────────────────────────────┘
//! ```
//!
//! # 防竞争字节
//!
//! 载荷中连续两个 `0x00` 之后插入的 `0x03` 用于避免与起始码混淆,
//! 解析语法前必须移除 (见 [`unescape_rbsp`]).

use liu_core::{LiuError, LiuResult};

/// NAL 单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum NalUnitType {
    /// 非 IDR 图像切片 (P/B slice)
    Slice,
    /// 数据分区 A (DPA)
    SliceDpa,
    /// 数据分区 B (DPB)
    SliceDpb,
    /// 数据分区 C (DPC)
    SliceDpc,
    /// IDR 图像切片 (关键帧)
    SliceIdr,
    /// 增补增强信息 (SEI)
    Sei,
    /// 序列参数集 (SPS)
    Sps,
    /// 图像参数集 (PPS)
    Pps,
    /// 访问单元分隔符 (AUD)
    Aud,
    /// 序列结束
    EndOfSequence,
    /// 流结束
    EndOfStream,
    /// 填充数据
    FillerData,
    /// 未知类型
    Unknown(u8),
}

impl NalUnitType {
    /// 从 NAL 类型编号创建
    pub fn from_type_id(type_id: u8) -> Self {
        match type_id {
            1 => Self::Slice,
            2 => Self::SliceDpa,
            3 => Self::SliceDpb,
            4 => Self::SliceDpc,
            5 => Self::SliceIdr,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::Aud,
            10 => Self::EndOfSequence,
            11 => Self::EndOfStream,
            12 => Self::FillerData,
            _ => Self::Unknown(type_id),
        }
    }

    /// 获取类型编号
    pub fn type_id(&self) -> u8 {
        match self {
            Self::Slice => 1,
            Self::SliceDpa => 2,
            Self::SliceDpb => 3,
            Self::SliceDpc => 4,
            Self::SliceIdr => 5,
            Self::Sei => 6,
            Self::Sps => 7,
            Self::Pps => 8,
            Self::Aud => 9,
            Self::EndOfSequence => 10,
            Self::EndOfStream => 11,
            Self::FillerData => 12,
            Self::Unknown(id) => *id,
        }
    }

    /// 是否为 VCL (Video Coding Layer) NAL
    pub fn is_vcl(&self) -> bool {
        matches!(
            self,
            Self::Slice | Self::SliceDpa | Self::SliceDpb | Self::SliceDpc | Self::SliceIdr
        )
    }

    /// 是否为关键帧 (IDR)
    pub fn is_idr(&self) -> bool {
        matches!(self, Self::SliceIdr)
    }
}

impl std::fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Slice => write!(f, "Slice"),
            Self::SliceDpa => write!(f, "SliceDPA"),
            Self::SliceDpb => write!(f, "SliceDPB"),
            Self::SliceDpc => write!(f, "SliceDPC"),
            Self::SliceIdr => write!(f, "IDR"),
            Self::Sei => write!(f, "SEI"),
            Self::Sps => write!(f, "SPS"),
            Self::Pps => write!(f, "PPS"),
            Self::Aud => write!(f, "AUD"),
            Self::EndOfSequence => write!(f, "EndOfSeq"),
            Self::EndOfStream => write!(f, "EndOfStream"),
            Self::FillerData => write!(f, "Filler"),
            Self::Unknown(id) => write!(f, "Unknown({id})"),
        }
    }
}

/// 解析后的 NAL 头字节
#[derive(Debug, Clone, Copy)]
pub struct NalHeader {
    /// NAL 单元类型
    pub nal_type: NalUnitType,
    /// nal_ref_idc (参考重要性, 0-3)
    pub ref_idc: u8,
}

impl NalHeader {
    /// 从头字节解析
    pub fn parse(byte: u8) -> LiuResult<Self> {
        let forbidden = (byte >> 7) & 1;
        if forbidden != 0 {
            return Err(LiuError::InvalidData(format!(
                "H264: forbidden_zero_bit 非法, header=0x{:02X}",
                byte
            )));
        }
        Ok(Self {
            nal_type: NalUnitType::from_type_id(byte & 0x1F),
            ref_idc: (byte >> 5) & 0x03,
        })
    }
}

/// 从 `from` 起查找下一个 `00 00 01` 起始码
///
/// 返回 NAL 头字节的下标 (起始码之后的位置). 4 字节起始码的前导零
/// 会被自然跳过. 未找到时返回 `None`.
pub(crate) fn next_start_code(data: &[u8], from: usize) -> Option<usize> {
    let mut i = from;
    while i + 2 < data.len() {
        if data[i] == 0x00 && data[i + 1] == 0x00 && data[i + 2] == 0x01 {
            return Some(i + 3);
        }
        i += 1;
    }
    None
}

/// 移除 NAL 载荷中的防竞争字节 (`00 00 03` → `00 00`)
///
/// `src` 为不含起始码与头字节的 NAL 载荷. 遇到 `00 00 00/01/02`
/// 视为越过了本 NAL 的末尾 (下一个起始码或零串), 在此截断.
///
/// 返回 (RBSP 数据, 消耗的源字节数). 消耗数可能小于 `src.len()`,
/// 调用方以此推进扫描位置.
pub fn unescape_rbsp(src: &[u8]) -> LiuResult<(Vec<u8>, usize)> {
    if src.is_empty() {
        return Err(LiuError::InvalidData("H264: NAL 载荷为空".into()));
    }

    let mut rbsp = Vec::with_capacity(src.len());
    let mut i = 0;
    while i < src.len() {
        if i + 2 < src.len() && src[i] == 0x00 && src[i + 1] == 0x00 {
            match src[i + 2] {
                0x03 => {
                    // 防竞争字节: 保留两个 0x00, 丢弃 0x03
                    rbsp.push(0x00);
                    rbsp.push(0x00);
                    i += 3;
                    continue;
                }
                0x00 | 0x01 | 0x02 => break,
                _ => {}
            }
        }
        rbsp.push(src[i]);
        i += 1;
    }

    Ok((rbsp, i))
}
