//! H.264 PPS (Picture Parameter Set) 解析器.
//!
//! 帧定界只消费 PPS 的前缀语法: 最关键的是 `sps_id` (slice 分类时
//! 经 PPS 间接找到 SPS). 其余字段解析到
//! `redundant_pic_cnt_present_flag` 为止, scaling list 尾部与定界无关.

use liu_core::bitreader::BitReader;
use liu_core::{LiuError, LiuResult};

use super::golomb::{read_se, read_ue};

/// PPS 解析结果
#[derive(Debug, Clone)]
pub struct Pps {
    /// PPS ID (pic_parameter_set_id)
    pub pps_id: u32,
    /// 引用的 SPS ID
    pub sps_id: u32,
    /// 熵编码模式 (0=CAVLC, 1=CABAC)
    pub entropy_coding_mode: u8,
    /// pic_order_present_flag
    pub pic_order_present: bool,
    /// list0 默认参考帧数
    pub num_ref_idx_l0_default_active: u32,
    /// list1 默认参考帧数
    pub num_ref_idx_l1_default_active: u32,
    /// weighted_pred_flag
    pub weighted_pred: bool,
    /// weighted_bipred_idc (0-2)
    pub weighted_bipred_idc: u32,
    /// 初始量化参数 (26 + pic_init_qp_minus26)
    pub pic_init_qp: i32,
    /// deblocking_filter_control_present_flag
    pub deblocking_filter_control: bool,
    /// redundant_pic_cnt_present_flag
    pub redundant_pic_cnt_present: bool,
}

/// 从 RBSP 数据解析 PPS
pub fn parse_pps(rbsp: &[u8]) -> LiuResult<Pps> {
    if rbsp.is_empty() {
        return Err(LiuError::InvalidData("H264: PPS RBSP 为空".into()));
    }

    let mut br = BitReader::new(rbsp);
    let pps_id = read_ue(&mut br)?;
    if pps_id > 255 {
        return Err(LiuError::InvalidData(format!(
            "H264: pps_id 超出范围, pps_id={}",
            pps_id
        )));
    }

    let sps_id = read_ue(&mut br)?;
    if sps_id > 31 {
        return Err(LiuError::InvalidData(format!(
            "H264: sps_id 超出范围, sps_id={}",
            sps_id
        )));
    }

    let entropy_coding_mode = br.read_bit()? as u8;
    let pic_order_present = br.read_bit()? == 1;

    let num_slice_groups_minus1 = read_ue(&mut br)?;
    if num_slice_groups_minus1 > 7 {
        return Err(LiuError::InvalidData(format!(
            "H264: num_slice_groups_minus1 超出范围, value={}",
            num_slice_groups_minus1
        )));
    }
    if num_slice_groups_minus1 > 0 {
        skip_slice_groups(&mut br, num_slice_groups_minus1)?;
    }

    let num_ref_idx_l0_default_active_minus1 = read_ue(&mut br)?;
    if num_ref_idx_l0_default_active_minus1 > 31 {
        return Err(LiuError::InvalidData(format!(
            "H264: num_ref_idx_l0_default_active_minus1 超出范围, value={}",
            num_ref_idx_l0_default_active_minus1
        )));
    }
    let num_ref_idx_l1_default_active_minus1 = read_ue(&mut br)?;
    if num_ref_idx_l1_default_active_minus1 > 31 {
        return Err(LiuError::InvalidData(format!(
            "H264: num_ref_idx_l1_default_active_minus1 超出范围, value={}",
            num_ref_idx_l1_default_active_minus1
        )));
    }

    let weighted_pred = br.read_bit()? == 1;
    let weighted_bipred_idc = br.read_bits(2)?;
    if weighted_bipred_idc > 2 {
        return Err(LiuError::InvalidData(format!(
            "H264: weighted_bipred_idc 非法, value={}",
            weighted_bipred_idc
        )));
    }

    // pic_init_qp_minus26: se(v)
    let qp_delta = read_se(&mut br)?;
    let pic_init_qp = 26 + qp_delta;
    if !(0..=51).contains(&pic_init_qp) {
        return Err(LiuError::InvalidData(format!(
            "H264: pic_init_qp 超出范围, pic_init_qp={}",
            pic_init_qp
        )));
    }

    // pic_init_qs_minus26: se(v)
    let _ = read_se(&mut br)?;
    // chroma_qp_index_offset: se(v)
    let _ = read_se(&mut br)?;

    let deblocking_filter_control = br.read_bit()? == 1;
    let _constrained_intra_pred = br.read_bit()?;
    let redundant_pic_cnt_present = br.read_bit()? == 1;

    // transform_8x8_mode / scaling list 尾部与定界无关, 不再读取

    Ok(Pps {
        pps_id,
        sps_id,
        entropy_coding_mode,
        pic_order_present,
        num_ref_idx_l0_default_active: num_ref_idx_l0_default_active_minus1 + 1,
        num_ref_idx_l1_default_active: num_ref_idx_l1_default_active_minus1 + 1,
        weighted_pred,
        weighted_bipred_idc,
        pic_init_qp,
        deblocking_filter_control,
        redundant_pic_cnt_present,
    })
}

/// 跳过 PPS 的 slice group 相关语法
fn skip_slice_groups(br: &mut BitReader, num_slice_groups_minus1: u32) -> LiuResult<()> {
    let slice_group_map_type = read_ue(br)?;
    match slice_group_map_type {
        0 => {
            for _ in 0..=num_slice_groups_minus1 {
                let _run_length_minus1 = read_ue(br)?;
            }
        }
        2 => {
            for _ in 0..num_slice_groups_minus1 {
                let _top_left = read_ue(br)?;
                let _bottom_right = read_ue(br)?;
            }
        }
        3..=5 => {
            br.skip_bits(1)?; // slice_group_change_direction_flag
            let _slice_group_change_rate_minus1 = read_ue(br)?;
        }
        6 => {
            let pic_size_in_map_units_minus1 = read_ue(br)?;
            let group_count = num_slice_groups_minus1 + 1;
            let bits_per_id = bits_for_slice_group_id(group_count);
            for _ in 0..=pic_size_in_map_units_minus1 {
                if bits_per_id > 0 {
                    br.skip_bits(bits_per_id)?;
                }
            }
        }
        _ => {
            return Err(LiuError::InvalidData(format!(
                "H264: slice_group_map_type 非法, value={}",
                slice_group_map_type
            )));
        }
    }
    Ok(())
}

fn bits_for_slice_group_id(group_count: u32) -> u32 {
    if group_count <= 1 {
        0
    } else {
        u32::BITS - (group_count - 1).leading_zeros()
    }
}
