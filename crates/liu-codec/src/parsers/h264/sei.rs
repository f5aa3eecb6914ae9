//! H.264 SEI (Supplemental Enhancement Information) 解析.
//!
//! 只解码影响图像分类的消息: buffering period (DTS 同步点标记)、
//! picture timing (CPB/DPB 延迟与 pic_struct)、recovery point
//! (渐进刷新的关键帧标记). 其余消息按 payload_size 跳过.

use liu_core::bitreader::BitReader;
use liu_core::{LiuError, LiuResult};
use log::debug;

use super::framer::ParameterSetCache;
use super::golomb::read_ue;
use super::sps::Sps;

const SEI_BUFFERING_PERIOD: u32 = 0;
const SEI_PIC_TIMING: u32 = 1;
const SEI_RECOVERY_POINT: u32 = 6;

// pic_struct 取值 (ITU-T H.264 表 D-1)
pub(super) const PIC_STRUCT_FRAME: u8 = 0;
pub(super) const PIC_STRUCT_TOP_FIELD: u8 = 1;
pub(super) const PIC_STRUCT_BOTTOM_FIELD: u8 = 2;
pub(super) const PIC_STRUCT_TOP_BOTTOM: u8 = 3;
pub(super) const PIC_STRUCT_BOTTOM_TOP: u8 = 4;
pub(super) const PIC_STRUCT_TOP_BOTTOM_TOP: u8 = 5;
pub(super) const PIC_STRUCT_BOTTOM_TOP_BOTTOM: u8 = 6;
pub(super) const PIC_STRUCT_FRAME_DOUBLING: u8 = 7;
pub(super) const PIC_STRUCT_FRAME_TRIPLING: u8 = 8;

/// SEI 解析得到的、影响图像分类的字段
///
/// 逐访问单元字段 (恢复点/延迟/缓冲期标记) 在每次分类前复位;
/// `pic_struct` 跨访问单元保留, 直到下一个 picture timing SEI 改写.
#[derive(Debug, Clone, Default)]
pub(super) struct SeiState {
    /// recovery point 的 recovery_frame_cnt
    pub recovery_frame_cnt: Option<u32>,
    /// 最近一次 picture timing 的 pic_struct
    pub pic_struct: Option<u8>,
    /// 当前访问单元的 cpb_removal_delay
    pub cpb_removal_delay: Option<u32>,
    /// 当前访问单元的 dpb_output_delay
    pub dpb_output_delay: Option<u32>,
    /// 当前访问单元是否出现 buffering period SEI
    pub buffering_period_present: bool,
}

impl SeiState {
    /// 复位逐访问单元字段
    pub(super) fn begin_access_unit(&mut self) {
        self.recovery_frame_cnt = None;
        self.cpb_removal_delay = None;
        self.dpb_output_delay = None;
        self.buffering_period_present = false;
    }
}

/// 解析一个 SEI NAL 的 RBSP, 更新 `state`
///
/// `active_sps` 为最近激活的 SPS, picture timing 的字段位宽取自其
/// HRD 参数; 为 `None` 时 picture timing 消息被跳过.
pub(super) fn parse_sei(
    rbsp: &[u8],
    cache: &ParameterSetCache,
    active_sps: Option<&Sps>,
    state: &mut SeiState,
) -> LiuResult<()> {
    let mut offset = 0usize;

    while offset < rbsp.len() {
        if is_rbsp_trailing_bits(&rbsp[offset..]) {
            break;
        }

        let payload_type = read_ff_coded_value(rbsp, &mut offset, "payload_type")?;
        let payload_size = read_ff_coded_value(rbsp, &mut offset, "payload_size")? as usize;
        let payload_end = offset.checked_add(payload_size).ok_or_else(|| {
            LiuError::InvalidData(format!("H264: SEI payload_size 溢出, value={payload_size}"))
        })?;
        if payload_end > rbsp.len() {
            return Err(LiuError::InvalidData(format!(
                "H264: SEI payload 截断, type={payload_type}, size={payload_size}, remain={}",
                rbsp.len().saturating_sub(offset)
            )));
        }
        let payload = &rbsp[offset..payload_end];
        offset = payload_end;

        match payload_type {
            SEI_BUFFERING_PERIOD => parse_buffering_period(payload, cache, state)?,
            SEI_PIC_TIMING => parse_pic_timing(payload, active_sps, state)?,
            SEI_RECOVERY_POINT => parse_recovery_point(payload, state)?,
            _ => {
                debug!(
                    "H264: 跳过 SEI payload, type={}, size={}",
                    payload_type, payload_size
                );
            }
        }
    }

    Ok(())
}

fn is_rbsp_trailing_bits(rest: &[u8]) -> bool {
    if rest.is_empty() {
        return true;
    }
    rest[0] == 0x80 && rest[1..].iter().all(|v| *v == 0)
}

/// 读取 SEI 的 0xFF 级联编码值 (payload_type / payload_size)
fn read_ff_coded_value(data: &[u8], offset: &mut usize, name: &str) -> LiuResult<u32> {
    let mut value = 0u32;
    loop {
        let byte = *data
            .get(*offset)
            .ok_or_else(|| LiuError::InvalidData(format!("H264: SEI {name} 截断")))?;
        *offset += 1;
        value = value
            .checked_add(u32::from(byte))
            .ok_or_else(|| LiuError::InvalidData(format!("H264: SEI {name} 溢出")))?;
        if byte != 0xFF {
            break;
        }
    }
    Ok(value)
}

/// buffering period: 标记 DTS 同步点
///
/// 引用不存在的 SPS 视为畸形消息, 本 SEI NAL 的后续消息一并放弃
/// (标记保持未设置).
fn parse_buffering_period(
    payload: &[u8],
    cache: &ParameterSetCache,
    state: &mut SeiState,
) -> LiuResult<()> {
    let mut br = BitReader::new(payload);
    let sps_id = read_ue(&mut br)?;
    if cache.sps(sps_id).is_none() {
        return Err(LiuError::InvalidData(format!(
            "H264: buffering period 引用了不存在的 SPS, sps_id={}",
            sps_id
        )));
    }
    // initial_cpb_removal_delay 的数值与分类无关, 不再读取
    state.buffering_period_present = true;
    Ok(())
}

/// picture timing: CPB/DPB 延迟与 pic_struct
fn parse_pic_timing(
    payload: &[u8],
    active_sps: Option<&Sps>,
    state: &mut SeiState,
) -> LiuResult<()> {
    let Some(sps) = active_sps else {
        debug!("H264: 尚无激活的 SPS, 跳过 picture timing SEI");
        return Ok(());
    };

    let mut br = BitReader::new(payload);
    if sps.cpb_dpb_delays_present {
        state.cpb_removal_delay = Some(br.read_bits(sps.cpb_removal_delay_length)?);
        state.dpb_output_delay = Some(br.read_bits(sps.dpb_output_delay_length)?);
    }
    if sps.pic_struct_present_flag {
        let pic_struct = br.read_bits(4)?;
        if pic_struct > u32::from(PIC_STRUCT_FRAME_TRIPLING) {
            return Err(LiuError::InvalidData(format!(
                "H264: pic_struct 非法, value={}",
                pic_struct
            )));
        }
        state.pic_struct = Some(pic_struct as u8);
        // 时钟时间戳 (clock timestamp) 语法与分类无关, 不再读取
    }
    Ok(())
}

/// recovery point: 渐进刷新流的关键帧标记
fn parse_recovery_point(payload: &[u8], state: &mut SeiState) -> LiuResult<()> {
    let mut br = BitReader::new(payload);
    let recovery_frame_cnt = read_ue(&mut br)?;
    let _exact_match_flag = br.read_bit()?;
    let _broken_link_flag = br.read_bit()?;
    let _changing_slice_group_idc = br.read_bits(2)?;
    state.recovery_frame_cnt = Some(recovery_frame_cnt);
    Ok(())
}
