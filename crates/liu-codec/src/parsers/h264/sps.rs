//! H.264 SPS (Sequence Parameter Set) 解析器.
//!
//! 帧定界只需要 SPS 的一个子集, 因此这里做部分解析:
//! - `log2_max_frame_num` (slice header 中 `frame_num` 的位宽)
//! - `frame_mbs_only_flag` (帧/场结构判定)
//! - 图像宽高 (宏块单位, 应用 cropping 调整)
//! - VUI 中的时序相关字段: `pic_struct_present_flag` 与 HRD 的
//!   CPB/DPB 延迟位宽 (SEI picture timing 解码依赖)
//!
//! scaling list 等与定界无关的语法仅按位消费, 不保留数值.

use liu_core::bitreader::BitReader;
use liu_core::{LiuError, LiuResult, Rational};

use super::golomb::{read_se, read_ue};

/// SPS 解析结果
#[derive(Debug, Clone)]
pub struct Sps {
    /// profile_idc (编码规格, 如 66=Baseline, 77=Main, 100=High)
    pub profile_idc: u8,
    /// constraint_set 标志位
    pub constraint_set_flags: u8,
    /// level_idc (编码级别, 如 30=3.0, 41=4.1)
    pub level_idc: u8,
    /// SPS ID (seq_parameter_set_id)
    pub sps_id: u32,
    /// 色度格式 (0=单色, 1=4:2:0, 2=4:2:2, 3=4:4:4)
    pub chroma_format_idc: u32,
    /// log2(max_frame_num) = log2_max_frame_num_minus4 + 4
    pub log2_max_frame_num: u32,
    /// 图像顺序计数类型 (0, 1, 2)
    pub poc_type: u32,
    /// log2(max_pic_order_cnt_lsb) (仅 poc_type==0)
    pub log2_max_poc_lsb: u32,
    /// 最大参考帧数
    pub max_num_ref_frames: u32,
    /// 图像宽度 (像素, 已应用 cropping)
    pub width: u32,
    /// 图像高度 (像素, 已应用 cropping)
    pub height: u32,
    /// 是否为帧编码 (非场编码)
    pub frame_mbs_only: bool,
    /// 是否存在 VUI 参数
    pub vui_present: bool,
    /// SAR (像素宽高比)
    pub sar: Rational,
    /// 帧率 (如果 VUI 中有 timing_info)
    pub fps: Option<Rational>,
    /// SEI picture timing 中是否携带 pic_struct
    pub pic_struct_present_flag: bool,
    /// HRD 是否声明了 CPB/DPB 延迟字段
    pub cpb_dpb_delays_present: bool,
    /// initial_cpb_removal_delay 位宽
    pub initial_cpb_removal_delay_length: u32,
    /// cpb_removal_delay 位宽
    pub cpb_removal_delay_length: u32,
    /// dpb_output_delay 位宽
    pub dpb_output_delay_length: u32,
    /// SEI 时钟时间戳 time_offset 位宽
    pub time_offset_length: u32,
}

/// 预定义的 SAR 表 (ITU-T H.264 表 E-1)
const SAR_TABLE: [(u32, u32); 17] = [
    (0, 1),    // 0: 未指定
    (1, 1),    // 1: 1:1
    (12, 11),  // 2: 12:11
    (10, 11),  // 3: 10:11
    (16, 11),  // 4: 16:11
    (40, 33),  // 5: 40:33
    (24, 11),  // 6: 24:11
    (20, 11),  // 7: 20:11
    (32, 11),  // 8: 32:11
    (80, 33),  // 9: 80:33
    (18, 11),  // 10: 18:11
    (15, 11),  // 11: 15:11
    (64, 33),  // 12: 64:33
    (160, 99), // 13: 160:99
    (4, 3),    // 14: 4:3
    (3, 2),    // 15: 3:2
    (2, 1),    // 16: 2:1
];

/// VUI 中与时序/显示相关的字段
struct VuiParams {
    sar: Rational,
    fps: Option<Rational>,
    pic_struct_present_flag: bool,
    cpb_dpb_delays_present: bool,
    initial_cpb_removal_delay_length: u32,
    cpb_removal_delay_length: u32,
    dpb_output_delay_length: u32,
    time_offset_length: u32,
}

impl Default for VuiParams {
    fn default() -> Self {
        Self {
            sar: Rational::new(1, 1),
            fps: None,
            pic_struct_present_flag: false,
            cpb_dpb_delays_present: false,
            // HRD 缺席时的规范默认位宽
            initial_cpb_removal_delay_length: 24,
            cpb_removal_delay_length: 24,
            dpb_output_delay_length: 24,
            time_offset_length: 24,
        }
    }
}

/// 从 RBSP 数据解析 SPS
pub fn parse_sps(rbsp: &[u8]) -> LiuResult<Sps> {
    if rbsp.len() < 3 {
        return Err(LiuError::InvalidData("H264: SPS RBSP 太短".into()));
    }

    let mut br = BitReader::new(rbsp);

    let profile_idc = br.read_bits(8)? as u8;
    let constraint_set_flags = br.read_bits(8)? as u8;
    let level_idc = br.read_bits(8)? as u8;

    let sps_id = read_ue(&mut br)?;
    if sps_id > 31 {
        return Err(LiuError::InvalidData(format!(
            "H264: sps_id 超出范围, sps_id={}",
            sps_id
        )));
    }

    let mut chroma_format_idc = 1; // 默认 4:2:0
    let mut separate_colour_plane_flag = false;

    // High profile 及以上有额外字段
    if is_high_profile(profile_idc) {
        chroma_format_idc = read_ue(&mut br)?;
        if chroma_format_idc > 3 {
            return Err(LiuError::InvalidData(format!(
                "H264: chroma_format_idc 非法, value={}",
                chroma_format_idc
            )));
        }
        if chroma_format_idc == 3 {
            separate_colour_plane_flag = br.read_bit()? == 1;
        }
        let bit_depth_luma = read_ue(&mut br)? + 8;
        let bit_depth_chroma = read_ue(&mut br)? + 8;
        if !(8..=14).contains(&bit_depth_luma) || !(8..=14).contains(&bit_depth_chroma) {
            return Err(LiuError::InvalidData(format!(
                "H264: 位深非法, luma={}, chroma={}",
                bit_depth_luma, bit_depth_chroma
            )));
        }
        br.skip_bits(1)?; // qpprime_y_zero_transform_bypass_flag

        // seq_scaling_matrix_present_flag: 语法需要消费, 数值与定界无关
        if br.read_bit()? == 1 {
            let list_count = if chroma_format_idc == 3 { 12 } else { 8 };
            for list_idx in 0..list_count {
                if br.read_bit()? == 1 {
                    skip_scaling_list(&mut br, if list_idx < 6 { 16 } else { 64 })?;
                }
            }
        }
    }

    let log2_max_frame_num_minus4 = read_ue(&mut br)?;
    if log2_max_frame_num_minus4 > 12 {
        return Err(LiuError::InvalidData(format!(
            "H264: log2_max_frame_num_minus4 超出范围, value={}",
            log2_max_frame_num_minus4
        )));
    }
    let log2_max_frame_num = log2_max_frame_num_minus4 + 4;

    let poc_type = read_ue(&mut br)?;
    if poc_type > 2 {
        return Err(LiuError::InvalidData(format!(
            "H264: pic_order_cnt_type 非法, value={}",
            poc_type
        )));
    }
    let mut log2_max_poc_lsb = 0u32;
    match poc_type {
        0 => {
            let log2_max_poc_lsb_minus4 = read_ue(&mut br)?;
            if log2_max_poc_lsb_minus4 > 12 {
                return Err(LiuError::InvalidData(format!(
                    "H264: log2_max_pic_order_cnt_lsb_minus4 超出范围, value={}",
                    log2_max_poc_lsb_minus4
                )));
            }
            log2_max_poc_lsb = log2_max_poc_lsb_minus4 + 4;
        }
        1 => {
            br.skip_bits(1)?; // delta_pic_order_always_zero_flag
            let _offset_for_non_ref_pic = read_se(&mut br)?;
            let _offset_for_top_to_bottom_field = read_se(&mut br)?;
            let num_ref_in_poc = read_ue(&mut br)?;
            if num_ref_in_poc > 255 {
                return Err(LiuError::InvalidData(format!(
                    "H264: num_ref_frames_in_pic_order_cnt_cycle 超出范围, value={}",
                    num_ref_in_poc
                )));
            }
            for _ in 0..num_ref_in_poc {
                let _offset_for_ref_frame = read_se(&mut br)?;
            }
        }
        _ => {} // poc_type == 2: 无额外字段
    }

    let max_num_ref_frames = read_ue(&mut br)?;
    if max_num_ref_frames > 16 {
        return Err(LiuError::InvalidData(format!(
            "H264: max_num_ref_frames 超出范围, value={}",
            max_num_ref_frames
        )));
    }
    br.skip_bits(1)?; // gaps_in_frame_num_value_allowed_flag

    // 图像尺寸 (宏块单位)
    let pic_width_in_mbs = read_ue(&mut br)? + 1;
    let pic_height_in_map_units = read_ue(&mut br)? + 1;

    let frame_mbs_only = br.read_bit()? == 1;
    if !frame_mbs_only {
        br.skip_bits(1)?; // mb_adaptive_frame_field_flag
    }

    br.skip_bits(1)?; // direct_8x8_inference_flag

    // Cropping
    let mut crop_left = 0u32;
    let mut crop_right = 0u32;
    let mut crop_top = 0u32;
    let mut crop_bottom = 0u32;
    if br.read_bit()? == 1 {
        crop_left = read_ue(&mut br)?;
        crop_right = read_ue(&mut br)?;
        crop_top = read_ue(&mut br)?;
        crop_bottom = read_ue(&mut br)?;
    }

    // 计算像素尺寸
    let chroma_array_type = if separate_colour_plane_flag {
        0
    } else {
        chroma_format_idc
    };
    let (crop_unit_x, crop_unit_y) = cropping_unit(chroma_array_type, frame_mbs_only);
    let raw_width = pic_width_in_mbs
        .checked_mul(16)
        .ok_or_else(|| LiuError::InvalidData("H264: 计算宽度时发生溢出".into()))?;
    let frame_height_in_mbs = pic_height_in_map_units
        .checked_mul(if frame_mbs_only { 1 } else { 2 })
        .ok_or_else(|| LiuError::InvalidData("H264: 计算高度时发生溢出".into()))?;
    let raw_height = frame_height_in_mbs
        .checked_mul(16)
        .ok_or_else(|| LiuError::InvalidData("H264: 计算高度时发生溢出".into()))?;
    let crop_x = crop_left
        .checked_add(crop_right)
        .and_then(|v| v.checked_mul(crop_unit_x))
        .ok_or_else(|| LiuError::InvalidData("H264: 计算水平裁剪时发生溢出".into()))?;
    let crop_y = crop_top
        .checked_add(crop_bottom)
        .and_then(|v| v.checked_mul(crop_unit_y))
        .ok_or_else(|| LiuError::InvalidData("H264: 计算垂直裁剪时发生溢出".into()))?;
    if crop_x >= raw_width || crop_y >= raw_height {
        return Err(LiuError::InvalidData(format!(
            "H264: 裁剪参数非法, raw={}x{}, crop_x={}, crop_y={}",
            raw_width, raw_height, crop_x, crop_y
        )));
    }
    let width = raw_width - crop_x;
    let height = raw_height - crop_y;

    // VUI 参数
    let mut vui_present = false;
    let mut vui = VuiParams::default();
    if br.read_bit()? == 1 {
        vui_present = true;
        vui = parse_vui(&mut br)?;
    }

    Ok(Sps {
        profile_idc,
        constraint_set_flags,
        level_idc,
        sps_id,
        chroma_format_idc,
        log2_max_frame_num,
        poc_type,
        log2_max_poc_lsb,
        max_num_ref_frames,
        width,
        height,
        frame_mbs_only,
        vui_present,
        sar: vui.sar,
        fps: vui.fps,
        pic_struct_present_flag: vui.pic_struct_present_flag,
        cpb_dpb_delays_present: vui.cpb_dpb_delays_present,
        initial_cpb_removal_delay_length: vui.initial_cpb_removal_delay_length,
        cpb_removal_delay_length: vui.cpb_removal_delay_length,
        dpb_output_delay_length: vui.dpb_output_delay_length,
        time_offset_length: vui.time_offset_length,
    })
}

// ============================================================
// 辅助函数
// ============================================================

/// 是否为 High Profile 或更高
fn is_high_profile(profile_idc: u8) -> bool {
    matches!(
        profile_idc,
        100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134
    )
}

/// 获取 cropping 单位
fn cropping_unit(chroma_format_idc: u32, frame_mbs_only: bool) -> (u32, u32) {
    let sub_width = match chroma_format_idc {
        0 | 3 => 1,
        _ => 2, // 4:2:0 和 4:2:2
    };
    let sub_height = match chroma_format_idc {
        0 | 2 | 3 => 1,
        _ => 2, // 4:2:0
    };
    let height_mult = if frame_mbs_only { 1 } else { 2 };

    (sub_width, sub_height * height_mult)
}

/// 按位消费一组 scaling list 语法, 丢弃数值
fn skip_scaling_list(br: &mut BitReader, size: usize) -> LiuResult<()> {
    let mut last_scale = 8i64;
    let mut next_scale = 8i64;
    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = read_se(br)?;
            next_scale = (last_scale + i64::from(delta_scale) + 256).rem_euclid(256);
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }
    Ok(())
}

/// 解析 VUI 参数中与定界/时序相关的部分
fn parse_vui(br: &mut BitReader) -> LiuResult<VuiParams> {
    let mut vui = VuiParams::default();

    // aspect_ratio_info_present_flag
    if br.read_bit()? == 1 {
        let ar_idc = br.read_bits(8)? as usize;
        if ar_idc == 255 {
            // Extended_SAR
            let sar_w = br.read_bits(16)?;
            let sar_h = br.read_bits(16)?;
            if sar_w == 0 || sar_h == 0 {
                return Err(LiuError::InvalidData(format!(
                    "H264: VUI Extended_SAR 非法, sar_w={}, sar_h={}",
                    sar_w, sar_h
                )));
            }
            vui.sar = Rational::new(sar_w as i32, sar_h as i32);
        } else if ar_idc < SAR_TABLE.len() {
            let (w, h) = SAR_TABLE[ar_idc];
            if w > 0 && h > 0 {
                vui.sar = Rational::new(w as i32, h as i32);
            }
        } else {
            return Err(LiuError::InvalidData(format!(
                "H264: VUI aspect_ratio_idc 非法, value={}",
                ar_idc
            )));
        }
    }

    // overscan_info_present_flag
    if br.read_bit()? == 1 {
        br.skip_bits(1)?; // overscan_appropriate_flag
    }

    // video_signal_type_present_flag
    if br.read_bit()? == 1 {
        br.skip_bits(3)?; // video_format
        br.skip_bits(1)?; // video_full_range_flag
        if br.read_bit()? == 1 {
            br.skip_bits(24)?; // colour_primaries / transfer / matrix
        }
    }

    // chroma_loc_info_present_flag
    if br.read_bit()? == 1 {
        let _chroma_top = read_ue(br)?;
        let _chroma_bottom = read_ue(br)?;
    }

    // timing_info_present_flag
    if br.read_bit()? == 1 {
        let num_units = br.read_bits(32)?;
        let time_scale = br.read_bits(32)?;
        br.skip_bits(1)?; // fixed_frame_rate_flag

        if num_units == 0 {
            return Err(LiuError::InvalidData(
                "H264: VUI num_units_in_tick 不能为 0".into(),
            ));
        }
        if time_scale == 0 {
            return Err(LiuError::InvalidData("H264: VUI time_scale 不能为 0".into()));
        }
        // H.264 定义: fps = time_scale / (2 * num_units_in_tick)
        vui.fps = Some(Rational::new(time_scale as i32, (num_units * 2) as i32));
    }

    // NAL / VCL HRD 参数
    let nal_hrd_present = br.read_bit()? == 1;
    if nal_hrd_present {
        parse_hrd(br, &mut vui)?;
    }
    let vcl_hrd_present = br.read_bit()? == 1;
    if vcl_hrd_present {
        parse_hrd(br, &mut vui)?;
    }
    vui.cpb_dpb_delays_present = nal_hrd_present || vcl_hrd_present;
    if vui.cpb_dpb_delays_present {
        br.skip_bits(1)?; // low_delay_hrd_flag
    }

    vui.pic_struct_present_flag = br.read_bit()? == 1;

    // bitstream_restriction 等余下语法与定界无关, 不再读取
    Ok(vui)
}

/// 解析 HRD 参数, 提取 SEI 时序字段的位宽
fn parse_hrd(br: &mut BitReader, vui: &mut VuiParams) -> LiuResult<()> {
    let cpb_cnt_minus1 = read_ue(br)?;
    if cpb_cnt_minus1 > 31 {
        return Err(LiuError::InvalidData(format!(
            "H264: cpb_cnt_minus1 超出范围, value={}",
            cpb_cnt_minus1
        )));
    }
    br.skip_bits(4)?; // bit_rate_scale
    br.skip_bits(4)?; // cpb_size_scale
    for _ in 0..=cpb_cnt_minus1 {
        let _bit_rate_value_minus1 = read_ue(br)?;
        let _cpb_size_value_minus1 = read_ue(br)?;
        br.skip_bits(1)?; // cbr_flag
    }
    vui.initial_cpb_removal_delay_length = br.read_bits(5)? + 1;
    vui.cpb_removal_delay_length = br.read_bits(5)? + 1;
    vui.dpb_output_delay_length = br.read_bits(5)? + 1;
    vui.time_offset_length = br.read_bits(5)?;
    Ok(())
}
