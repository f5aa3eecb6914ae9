//! H.264 帧定界器入口.
//!
//! [`H264Framer`] 把三个部件串成一条流水线:
//! 1. 边界扫描器在输入中寻找访问单元边界 (状态跨调用持久);
//! 2. 重组缓冲把任意分片的输入拼成完整帧;
//! 3. NAL 遍历器对完整帧做部分解码, 从首个 slice header 得到图像元数据.
//!
//! 分类失败只影响当前访问单元: 扫描器与重组缓冲的状态不受影响,
//! 字节级推进在下一次调用继续.
//!
//! 一个实例只服务一条基本流, 不做内部同步; 多条流各建实例.
//! 上游若存在待显示图像的背压门控 (如硬解驱动的 display queue),
//! 应在调用 [`H264Framer::parse`] 之前自行检查, 这不是定界器状态.

use std::collections::HashMap;

use liu_core::bitreader::BitReader;
use liu_core::{LiuError, LiuResult};
use log::{debug, warn};

use super::assembler::FrameAssembler;
use super::golomb::read_ue;
use super::nal::{self, NalHeader, NalUnitType};
use super::pps::{Pps, parse_pps};
use super::scanner::BoundaryScanner;
use super::sei::{self, SeiState};
use super::sps::{Sps, parse_sps};

/// 支持的最大 SPS 个数 (sps_id ∈ [0, 31])
pub const MAX_SPS_COUNT: u32 = 32;
/// 支持的最大 PPS 个数 (pps_id ∈ [0, 255])
pub const MAX_PPS_COUNT: u32 = 256;

/// slice NAL 只需头部字段, 遍历时截取的前缀长度 (含 NAL 头字节)
const SLICE_PREFIX_LIMIT: usize = 20;

/// slice_type % 5 → 图像类型
const PICT_TYPE_BY_SLICE_TYPE: [PictureType; 5] = [
    PictureType::P,
    PictureType::B,
    PictureType::I,
    PictureType::Sp,
    PictureType::Si,
];

/// 图像类型 (由 slice_type 映射)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureType {
    /// I 帧 (帧内编码)
    I,
    /// P 帧 (前向预测)
    P,
    /// B 帧 (双向预测)
    B,
    /// SP 帧 (切换 P)
    Sp,
    /// SI 帧 (切换 I)
    Si,
}

impl std::fmt::Display for PictureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::I => write!(f, "I"),
            Self::P => write!(f, "P"),
            Self::B => write!(f, "B"),
            Self::Sp => write!(f, "SP"),
            Self::Si => write!(f, "SI"),
        }
    }
}

/// 图像的帧/场结构
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureStructure {
    /// 完整帧
    Frame,
    /// 顶场
    TopField,
    /// 底场
    BottomField,
}

impl std::fmt::Display for PictureStructure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Frame => write!(f, "frame"),
            Self::TopField => write!(f, "top_field"),
            Self::BottomField => write!(f, "bottom_field"),
        }
    }
}

/// 一个访问单元的图像元数据
///
/// 由首个成功解析的 slice header 得出, 参数集字段为缓存条目的
/// 值拷贝快照.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureInfo {
    /// 图像类型 (I/P/B/SP/SI)
    pub pict_type: PictureType,
    /// 是否关键帧 (IDR, 或带非负 recovery_frame_cnt 的恢复点)
    pub key_frame: bool,
    /// 帧/场结构
    pub picture_structure: PictureStructure,
    /// slice header 中的 frame_num
    pub frame_num: u32,
    /// slice 引用的 PPS id
    pub pps_id: u32,
    /// 经 PPS 间接引用的 SPS id
    pub sps_id: u32,
    /// 显示重复因子 (由 SEI pic_struct 映射)
    pub repeat_pict: u8,
    /// SEI picture timing 的 cpb_removal_delay
    pub cpb_removal_delay: Option<u32>,
    /// SEI picture timing 的 dpb_output_delay
    pub dpb_output_delay: Option<u32>,
    /// 本访问单元是否出现 buffering period SEI (DTS 同步点)
    pub buffering_period_present: bool,
}

/// 一次 [`H264Framer::parse`] 调用的输出
#[derive(Debug)]
pub struct ParseOutput<'a> {
    /// 本次调用消费的输入字节数; 余下的 `input[consumed..]` 应在
    /// 下一次调用重新送入
    pub consumed: usize,
    /// 完整的访问单元字节 (含起始码), 仅在下一次调用前有效
    pub frame: Option<&'a [u8]>,
    /// 图像元数据; 分类失败时为 `None` (错误已记录日志)
    pub picture: Option<PictureInfo>,
}

/// 参数集缓存
///
/// 以 id 为键的两张有界映射表, 归属单个定界器实例 (无全局可变状态).
/// 分类时按值拷贝条目: 之后同名 id 的改写不影响已返回的结果.
#[derive(Debug, Default)]
pub struct ParameterSetCache {
    sps: HashMap<u32, Sps>,
    pps: HashMap<u32, Pps>,
}

impl ParameterSetCache {
    /// 存入 SPS, id 越界时报错
    pub fn put_sps(&mut self, sps: Sps) -> LiuResult<()> {
        if sps.sps_id >= MAX_SPS_COUNT {
            return Err(LiuError::InvalidArgument(format!(
                "H264: sps_id 超出缓存上限, sps_id={}",
                sps.sps_id
            )));
        }
        self.sps.insert(sps.sps_id, sps);
        Ok(())
    }

    /// 存入 PPS, id 越界时报错
    pub fn put_pps(&mut self, pps: Pps) -> LiuResult<()> {
        if pps.pps_id >= MAX_PPS_COUNT {
            return Err(LiuError::InvalidArgument(format!(
                "H264: pps_id 超出缓存上限, pps_id={}",
                pps.pps_id
            )));
        }
        self.pps.insert(pps.pps_id, pps);
        Ok(())
    }

    /// 查询 SPS
    pub fn sps(&self, sps_id: u32) -> Option<&Sps> {
        self.sps.get(&sps_id)
    }

    /// 查询 PPS
    pub fn pps(&self, pps_id: u32) -> Option<&Pps> {
        self.pps.get(&pps_id)
    }

    /// 已缓存的 SPS 个数
    pub fn sps_count(&self) -> usize {
        self.sps.len()
    }

    /// 已缓存的 PPS 个数
    pub fn pps_count(&self) -> usize {
        self.pps.len()
    }

    /// 清空缓存
    pub fn clear(&mut self) {
        self.sps.clear();
        self.pps.clear();
    }
}

/// NAL 遍历器: 在完整帧内逐 NAL 分发, 分类首个 slice
#[derive(Debug, Default)]
struct NalWalker {
    params: ParameterSetCache,
    sei: SeiState,
    /// 最近激活的 SPS id (SEI picture timing 的位宽来源)
    active_sps_id: Option<u32>,
}

impl NalWalker {
    /// 遍历 `frame` 内的 NAL 单元, 返回首个 slice 的分类结果
    fn classify(&mut self, frame: &[u8]) -> LiuResult<PictureInfo> {
        self.sei.begin_access_unit();

        let mut pos = 0usize;
        while let Some(header_pos) = nal::next_start_code(frame, pos) {
            if header_pos >= frame.len() {
                break;
            }
            let header = match NalHeader::parse(frame[header_pos]) {
                Ok(h) => h,
                Err(err) => {
                    debug!("H264: 跳过畸形 NAL 头, err={}", err);
                    pos = header_pos;
                    continue;
                }
            };

            let mut nal_bytes = &frame[header_pos..];
            if matches!(header.nal_type, NalUnitType::Slice | NalUnitType::SliceIdr)
                && nal_bytes.len() > SLICE_PREFIX_LIMIT
            {
                // slice 只需要头部字段, 不必遍历整个载荷
                nal_bytes = &nal_bytes[..SLICE_PREFIX_LIMIT];
            }

            let (rbsp, consumed) = match nal::unescape_rbsp(&nal_bytes[1..]) {
                Ok(v) => v,
                Err(err) => {
                    debug!(
                        "H264: NAL 去转义失败, 跳过, type={}, err={}",
                        header.nal_type, err
                    );
                    pos = header_pos;
                    continue;
                }
            };

            match header.nal_type {
                NalUnitType::Sps => self.handle_sps(&rbsp),
                NalUnitType::Pps => self.handle_pps(&rbsp),
                NalUnitType::Sei => {
                    let active_sps = self.active_sps_id.and_then(|id| self.params.sps(id));
                    if let Err(err) =
                        sei::parse_sei(&rbsp, &self.params, active_sps, &mut self.sei)
                    {
                        debug!("H264: SEI 解析失败, err={}", err);
                    }
                }
                NalUnitType::Slice | NalUnitType::SliceIdr => {
                    // 首个 slice header 即可完整分类本访问单元
                    return self.classify_slice(&rbsp, header.nal_type.is_idr());
                }
                _ => {}
            }

            pos = header_pos + 1 + consumed;
        }

        Err(LiuError::NoPictureFound)
    }

    fn handle_sps(&mut self, rbsp: &[u8]) {
        match parse_sps(rbsp) {
            Ok(sps) => {
                debug!(
                    "H264: SPS id={} {}x{} profile={} level={}",
                    sps.sps_id, sps.width, sps.height, sps.profile_idc, sps.level_idc
                );
                let sps_id = sps.sps_id;
                if let Err(err) = self.params.put_sps(sps) {
                    warn!("H264: SPS 入缓存失败, err={}", err);
                    return;
                }
                if self.active_sps_id.map(|id| id == sps_id).unwrap_or(true) {
                    self.active_sps_id = Some(sps_id);
                }
            }
            Err(err) => warn!("H264: SPS 解析失败, err={}", err),
        }
    }

    fn handle_pps(&mut self, rbsp: &[u8]) {
        match parse_pps(rbsp) {
            Ok(pps) => {
                debug!(
                    "H264: PPS id={} sps={} entropy={}",
                    pps.pps_id,
                    pps.sps_id,
                    if pps.entropy_coding_mode == 1 {
                        "CABAC"
                    } else {
                        "CAVLC"
                    }
                );
                if let Err(err) = self.params.put_pps(pps) {
                    warn!("H264: PPS 入缓存失败, err={}", err);
                }
            }
            Err(err) => warn!("H264: PPS 解析失败, err={}", err),
        }
    }

    /// 部分解码 slice header, 生成图像元数据
    fn classify_slice(&mut self, rbsp: &[u8], is_idr: bool) -> LiuResult<PictureInfo> {
        let mut br = BitReader::new(rbsp);

        let _first_mb_in_slice = read_ue(&mut br)?;
        let slice_type = read_ue(&mut br)?;
        if slice_type > 9 {
            return Err(LiuError::InvalidData(format!(
                "H264: slice_type 非法, value={}",
                slice_type
            )));
        }
        let pict_type = PICT_TYPE_BY_SLICE_TYPE[(slice_type % 5) as usize];

        let pps_id = read_ue(&mut br)?;
        if pps_id >= MAX_PPS_COUNT {
            return Err(LiuError::UnknownParameterSet(format!(
                "H264: pps_id 超出范围, pps_id={}",
                pps_id
            )));
        }
        // 快照拷贝: 之后对缓存条目的改写不能影响已返回的结果
        let pps = self.params.pps(pps_id).cloned().ok_or_else(|| {
            LiuError::UnknownParameterSet(format!(
                "H264: 引用了不存在的 PPS, pps_id={}",
                pps_id
            ))
        })?;
        let sps = self.params.sps(pps.sps_id).cloned().ok_or_else(|| {
            LiuError::UnknownParameterSet(format!(
                "H264: PPS 引用了不存在的 SPS, sps_id={}",
                pps.sps_id
            ))
        })?;
        self.active_sps_id = Some(sps.sps_id);

        let frame_num = br.read_bits(sps.log2_max_frame_num)?;

        let picture_structure = if sps.frame_mbs_only {
            PictureStructure::Frame
        } else if br.read_bit()? == 1 {
            // field_pic_flag=1: bottom_field_flag 决定顶/底场
            if br.read_bit()? == 1 {
                PictureStructure::BottomField
            } else {
                PictureStructure::TopField
            }
        } else {
            PictureStructure::Frame
        };

        let key_frame = is_idr || self.sei.recovery_frame_cnt.is_some();
        let repeat_pict = repeat_pict_from_sei(&sps, &self.sei, picture_structure);

        Ok(PictureInfo {
            pict_type,
            key_frame,
            picture_structure,
            frame_num,
            pps_id,
            sps_id: sps.sps_id,
            repeat_pict,
            cpb_removal_delay: self.sei.cpb_removal_delay,
            dpb_output_delay: self.sei.dpb_output_delay,
            buffering_period_present: self.sei.buffering_period_present,
        })
    }
}

/// SEI pic_struct → repeat_pict 映射
fn repeat_pict_from_sei(sps: &Sps, state: &SeiState, structure: PictureStructure) -> u8 {
    let frame_default = if structure == PictureStructure::Frame {
        1
    } else {
        0
    };
    if !sps.pic_struct_present_flag {
        return frame_default;
    }
    match state.pic_struct {
        Some(sei::PIC_STRUCT_TOP_FIELD) | Some(sei::PIC_STRUCT_BOTTOM_FIELD) => 0,
        Some(sei::PIC_STRUCT_FRAME)
        | Some(sei::PIC_STRUCT_TOP_BOTTOM)
        | Some(sei::PIC_STRUCT_BOTTOM_TOP) => 1,
        Some(sei::PIC_STRUCT_TOP_BOTTOM_TOP) | Some(sei::PIC_STRUCT_BOTTOM_TOP_BOTTOM) => 2,
        Some(sei::PIC_STRUCT_FRAME_DOUBLING) => 3,
        Some(sei::PIC_STRUCT_FRAME_TRIPLING) => 5,
        _ => frame_default,
    }
}

/// H.264 裸流帧定界器
///
/// 一个实例服务一条基本流. 典型用法:
///
/// ```
/// use liu_codec::parsers::h264::H264Framer;
///
/// let mut framer = H264Framer::new();
/// let mut input: &[u8] = &[/* 码流分片 */];
/// while !input.is_empty() {
///     let out = framer.parse(input).unwrap();
///     if let Some(frame) = out.frame {
///         // frame 为一个完整访问单元, out.picture 为其元数据
///         let _ = frame;
///     }
///     input = &input[out.consumed..];
/// }
/// ```
#[derive(Debug, Default)]
pub struct H264Framer {
    scan: BoundaryScanner,
    assembly: FrameAssembler,
    walk: NalWalker,
}

impl H264Framer {
    /// 创建定界器实例
    pub fn new() -> Self {
        Self::default()
    }

    /// 送入一段输入, 尝试定界出一个完整访问单元
    ///
    /// 返回值语义见 [`ParseOutput`]. 未消费的输入字节应在下一次调用
    /// 重新送入. 空输入返回 [`LiuError::InvalidArgument`], 状态不变.
    pub fn parse<'a>(&'a mut self, input: &'a [u8]) -> LiuResult<ParseOutput<'a>> {
        if input.is_empty() {
            return Err(LiuError::InvalidArgument("H264: 输入缓冲为空".into()));
        }
        self.assembly.discard_delivered();

        let Some(offset) = self.scan.find_frame_end(input) else {
            // 未定界: 整体吸收, 下次调用继续
            self.assembly.absorb(input)?;
            return Ok(ParseOutput {
                consumed: input.len(),
                frame: None,
                picture: None,
            });
        };

        let (frame, consumed) = if offset >= 0 {
            let take = offset as usize;
            (self.assembly.complete_forward(input, take), take)
        } else {
            // 边界落在此前已吸收的字节内: 当前输入一个字节都未消费.
            // 缓冲尾部属于下一单元, 对其做扫描器状态回放 (只刷新状态,
            // 不产生输出), 避免跨调用碎片被重复计数.
            let (frame, tail) = self.assembly.complete_backward(offset)?;
            let replay = self.scan.find_frame_end(tail);
            debug_assert!(replay.is_none(), "状态回放不应再次定界");
            (frame, 0)
        };

        let picture = match self.walk.classify(frame) {
            Ok(info) => Some(info),
            Err(err) => {
                warn!("H264: 访问单元分类失败, err={}", err);
                None
            }
        };

        Ok(ParseOutput {
            consumed,
            frame: Some(frame),
            picture,
        })
    }

    /// 输入结束时冲刷: 将缓冲中剩余的字节作为最后一个访问单元交付
    pub fn flush(&mut self) -> LiuResult<ParseOutput<'_>> {
        self.assembly.discard_delivered();
        self.scan.reset();
        if self.assembly.pending() == 0 {
            return Ok(ParseOutput {
                consumed: 0,
                frame: None,
                picture: None,
            });
        }

        let (frame, _) = self.assembly.complete_backward(0)?;
        let picture = match self.walk.classify(frame) {
            Ok(info) => Some(info),
            Err(err) => {
                warn!("H264: 访问单元分类失败, err={}", err);
                None
            }
        };
        Ok(ParseOutput {
            consumed: 0,
            frame: Some(frame),
            picture,
        })
    }

    /// 对一个完整访问单元执行 NAL 遍历分类
    ///
    /// 与 [`H264Framer::parse`] 内部的分类路径一致, 但把错误作为
    /// 类型化结果返回, 供需要区分失败原因的调用方使用. 定界状态
    /// (扫描器/重组缓冲) 不受影响.
    pub fn classify(&mut self, frame: &[u8]) -> LiuResult<PictureInfo> {
        self.walk.classify(frame)
    }

    /// 参数集缓存的只读视图
    pub fn parameter_sets(&self) -> &ParameterSetCache {
        &self.walk.params
    }

    /// 复位: 释放重组缓冲, 重置扫描与 SEI 状态
    ///
    /// 参数集缓存保留, 便于流内 seek 后继续分类.
    pub fn reset(&mut self) {
        self.scan.reset();
        self.assembly.reset();
        self.walk.sei = SeiState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::h264::test_bits::{
        BitVec, TestSps, annexb_nal, bits_to_bytes, build_pps_rbsp, build_slice_rbsp,
        build_sps_rbsp,
    };

    /// SPS(id=0) + PPS(id=0→sps 0) 的参数集帧
    fn config_frame(cfg: &TestSps) -> Vec<u8> {
        let mut frame = annexb_nal(0x67, &build_sps_rbsp(cfg), true);
        frame.extend_from_slice(&annexb_nal(0x68, &build_pps_rbsp(0, cfg.sps_id), false));
        frame
    }

    /// 准备好参数集的遍历器
    fn walker_with_params(cfg: &TestSps) -> NalWalker {
        let mut walker = NalWalker::default();
        let err = walker
            .classify(&config_frame(cfg))
            .expect_err("纯参数集帧不应产出图像");
        assert!(matches!(err, LiuError::NoPictureFound));
        walker
    }

    fn slice_frame(header: u8, slice_type: u32, pps_id: u32) -> Vec<u8> {
        annexb_nal(header, &build_slice_rbsp(0, slice_type, pps_id, 1, 4), false)
    }

    #[test]
    fn test_slice_type_five_way_cycle() {
        // slice_type 0..=9 按 %5 映射到 {P,B,I,SP,SI} 循环
        let expected = [
            PictureType::P,
            PictureType::B,
            PictureType::I,
            PictureType::Sp,
            PictureType::Si,
        ];
        let mut walker = walker_with_params(&TestSps::default());
        for slice_type in 0u32..10 {
            let info = walker
                .classify(&slice_frame(0x41, slice_type, 0))
                .expect("slice 分类失败");
            assert_eq!(
                info.pict_type,
                expected[(slice_type % 5) as usize],
                "slice_type={} 映射错误",
                slice_type
            );
        }
    }

    #[test]
    fn test_idr_is_key_frame() {
        let mut walker = walker_with_params(&TestSps::default());
        let info = walker.classify(&slice_frame(0x65, 2, 0)).unwrap();
        assert!(info.key_frame);
        assert_eq!(info.pict_type, PictureType::I);
        assert_eq!(info.picture_structure, PictureStructure::Frame);

        let info = walker.classify(&slice_frame(0x41, 0, 0)).unwrap();
        assert!(!info.key_frame, "普通 P slice 不是关键帧");
    }

    #[test]
    fn test_recovery_point_marks_key_frame() {
        let mut walker = walker_with_params(&TestSps::default());
        // recovery point SEI (recovery_frame_cnt=0) + P slice
        let mut frame = annexb_nal(0x06, &[0x06, 0x01, 0x80, 0x80], false);
        frame.extend_from_slice(&slice_frame(0x41, 0, 0));
        let info = walker.classify(&frame).unwrap();
        assert!(info.key_frame, "恢复点应标记关键帧");
        assert_eq!(info.pict_type, PictureType::P);

        // 恢复点是逐访问单元的, 下一个单元不再保留
        let info = walker.classify(&slice_frame(0x41, 0, 0)).unwrap();
        assert!(!info.key_frame);
    }

    #[test]
    fn test_frame_num_read_with_sps_bit_width() {
        let cfg = TestSps {
            log2_max_frame_num_minus4: 2, // frame_num 为 6 位
            ..TestSps::default()
        };
        let mut walker = walker_with_params(&cfg);
        let frame = annexb_nal(0x41, &build_slice_rbsp(0, 0, 0, 37, 6), false);
        let info = walker.classify(&frame).unwrap();
        assert_eq!(info.frame_num, 37);
    }

    #[test]
    fn test_unknown_pps_in_range() {
        let mut walker = walker_with_params(&TestSps::default());
        let err = walker
            .classify(&slice_frame(0x41, 0, 5))
            .expect_err("引用未缓存的 pps_id 应失败");
        assert!(matches!(err, LiuError::UnknownParameterSet(_)));
    }

    #[test]
    fn test_unknown_pps_out_of_range() {
        let mut walker = walker_with_params(&TestSps::default());
        let err = walker
            .classify(&slice_frame(0x41, 0, 300))
            .expect_err("pps_id 超出上限应失败");
        assert!(matches!(err, LiuError::UnknownParameterSet(_)));
    }

    #[test]
    fn test_pps_referencing_missing_sps() {
        let mut walker = NalWalker::default();
        // 只有 PPS (引用 sps_id=0), 没有 SPS
        let frame = annexb_nal(0x68, &build_pps_rbsp(0, 0), true);
        let _ = walker.classify(&frame);
        let err = walker
            .classify(&slice_frame(0x41, 0, 0))
            .expect_err("PPS 引用缺失的 SPS 应失败");
        assert!(matches!(err, LiuError::UnknownParameterSet(_)));
    }

    #[test]
    fn test_no_picture_found() {
        let mut walker = NalWalker::default();
        let err = walker
            .classify(&config_frame(&TestSps::default()))
            .expect_err("没有 slice 的帧应报 NoPictureFound");
        assert!(matches!(err, LiuError::NoPictureFound));
    }

    #[test]
    fn test_long_slice_payload_prefix_capped() {
        let mut walker = walker_with_params(&TestSps::default());
        // slice 载荷远超 20 字节, 分类只读头部前缀
        let mut rbsp = build_slice_rbsp(0, 2, 0, 1, 4);
        rbsp.extend(std::iter::repeat_n(0xAA, 400));
        let frame = annexb_nal(0x65, &rbsp, false);
        let info = walker.classify(&frame).unwrap();
        assert_eq!(info.pict_type, PictureType::I);
    }

    #[test]
    fn test_field_picture_structure() {
        let cfg = TestSps {
            frame_mbs_only: false,
            ..TestSps::default()
        };
        let mut walker = walker_with_params(&cfg);

        // 手工构造带 field_pic_flag / bottom_field_flag 的 slice header
        let build_field_slice = |field_pic: bool, bottom: bool| -> Vec<u8> {
            let mut bits = BitVec::new();
            bits.write_ue(0); // first_mb_in_slice
            bits.write_ue(0); // slice_type = P
            bits.write_ue(0); // pps_id
            bits.push_bits(1, 4); // frame_num
            bits.push_bit(field_pic);
            if field_pic {
                bits.push_bit(bottom);
            }
            bits.push_bits(0xFFFF, 16);
            annexb_nal(0x41, &bits_to_bytes(bits.as_slice()), false)
        };

        let info = walker.classify(&build_field_slice(false, false)).unwrap();
        assert_eq!(info.picture_structure, PictureStructure::Frame);

        let info = walker.classify(&build_field_slice(true, false)).unwrap();
        assert_eq!(info.picture_structure, PictureStructure::TopField);

        let info = walker.classify(&build_field_slice(true, true)).unwrap();
        assert_eq!(info.picture_structure, PictureStructure::BottomField);
    }

    #[test]
    fn test_repeat_pict_mapping_table() {
        // (pic_struct, 期望 repeat_pict)
        let cases = [
            (0u32, 1u8), // FRAME
            (1, 0),      // TOP_FIELD
            (2, 0),      // BOTTOM_FIELD
            (3, 1),      // TOP_BOTTOM
            (4, 1),      // BOTTOM_TOP
            (5, 2),      // TOP_BOTTOM_TOP
            (6, 2),      // BOTTOM_TOP_BOTTOM
            (7, 3),      // FRAME_DOUBLING
            (8, 5),      // FRAME_TRIPLING
        ];
        let cfg = TestSps {
            pic_struct_present: true,
            ..TestSps::default()
        };
        for (pic_struct, expected) in cases {
            let mut walker = walker_with_params(&cfg);
            // picture timing SEI: cpb(8) + dpb(8) + pic_struct(4)
            let mut bits = BitVec::new();
            bits.push_bits(0x11, 8);
            bits.push_bits(0x22, 8);
            bits.push_bits(pic_struct, 4);
            let timing = bits_to_bytes(bits.as_slice());
            let mut sei_rbsp = vec![0x01, timing.len() as u8];
            sei_rbsp.extend_from_slice(&timing);
            sei_rbsp.push(0x80);

            let mut frame = annexb_nal(0x06, &sei_rbsp, false);
            frame.extend_from_slice(&slice_frame(0x41, 0, 0));
            let info = walker.classify(&frame).unwrap();
            assert_eq!(
                info.repeat_pict, expected,
                "pic_struct={} 的 repeat_pict 映射错误",
                pic_struct
            );
            assert_eq!(info.cpb_removal_delay, Some(0x11));
            assert_eq!(info.dpb_output_delay, Some(0x22));
        }
    }

    #[test]
    fn test_repeat_pict_unknown_pic_struct_defaults_by_structure() {
        // SPS 声明 pic_struct_present, 但尚未收到 picture timing SEI:
        // FRAME 结构 → 1
        let cfg = TestSps {
            pic_struct_present: true,
            ..TestSps::default()
        };
        let mut walker = walker_with_params(&cfg);
        let info = walker.classify(&slice_frame(0x41, 0, 0)).unwrap();
        assert_eq!(info.repeat_pict, 1);

        // 无 pic_struct_present 的 SPS: 同样按结构取默认值
        let mut walker = walker_with_params(&TestSps::default());
        let info = walker.classify(&slice_frame(0x41, 0, 0)).unwrap();
        assert_eq!(info.repeat_pict, 1);
    }

    #[test]
    fn test_parse_empty_input_invalid_argument() {
        let mut framer = H264Framer::new();
        let err = framer.parse(&[]).expect_err("空输入应报 InvalidArgument");
        assert!(matches!(err, LiuError::InvalidArgument(_)));
    }

    #[test]
    fn test_parse_delivers_frame_and_picture() {
        let mut stream = config_frame(&TestSps::default());
        stream.extend_from_slice(&slice_frame(0x65, 2, 0));
        let tail_start = stream.len();
        stream.extend_from_slice(&slice_frame(0x41, 0, 0));

        let mut framer = H264Framer::new();
        let out = framer.parse(&stream).unwrap();
        let frame = out.frame.expect("应交付完整帧");
        assert_eq!(frame, &stream[..tail_start]);
        assert_eq!(out.consumed, tail_start);
        let info = out.picture.expect("应产出图像元数据");
        assert!(info.key_frame);
        assert_eq!(info.pict_type, PictureType::I);
    }

    #[test]
    fn test_classification_error_keeps_framing_alive() {
        // slice 引用不存在的 PPS: 分类失败, 但帧照常交付, 后续继续推进
        let mut stream = slice_frame(0x65, 2, 0);
        let first_len = stream.len();
        stream.extend_from_slice(&slice_frame(0x41, 0, 0));

        let mut framer = H264Framer::new();
        let out = framer.parse(&stream).unwrap();
        assert_eq!(out.frame.unwrap(), &stream[..first_len]);
        assert!(out.picture.is_none(), "缺参数集时不应产出元数据");

        // 流继续: 剩余输入可以继续送入
        let rest = &stream[out.consumed..];
        let out = framer.parse(rest).unwrap();
        assert!(out.frame.is_none());
        assert_eq!(out.consumed, rest.len());
    }

    #[test]
    fn test_flush_delivers_trailing_unit() {
        let mut stream = config_frame(&TestSps::default());
        stream.extend_from_slice(&slice_frame(0x65, 2, 0));

        let mut framer = H264Framer::new();
        let out = framer.parse(&stream).unwrap();
        assert!(out.frame.is_none(), "单个访问单元未结束不应交付");
        assert_eq!(out.consumed, stream.len());

        let out = framer.flush().unwrap();
        assert_eq!(out.frame.unwrap(), &stream[..]);
        assert!(out.picture.unwrap().key_frame);

        // 再次冲刷无内容
        let out = framer.flush().unwrap();
        assert!(out.frame.is_none());
    }

    #[test]
    fn test_reset_releases_assembly_keeps_params() {
        let mut framer = H264Framer::new();
        let stream = config_frame(&TestSps::default());
        let _ = framer.parse(&stream).unwrap();
        framer.reset();

        let out = framer.flush().unwrap();
        assert!(out.frame.is_none(), "复位后缓冲应已清空");
    }

    #[test]
    fn test_parameter_set_cache_bounds() {
        let mut cache = ParameterSetCache::default();
        let mut sps = {
            let rbsp = build_sps_rbsp(&TestSps::default());
            parse_sps(&rbsp).unwrap()
        };
        sps.sps_id = 32;
        assert!(cache.put_sps(sps).is_err(), "越界 sps_id 不应入缓存");
        assert_eq!(cache.sps_count(), 0);
    }
}
