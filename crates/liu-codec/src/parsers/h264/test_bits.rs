//! 测试辅助: 按位构造 RBSP 数据.

/// 位向量构造器
pub(crate) struct BitVec {
    bits: Vec<bool>,
}

impl BitVec {
    pub(crate) fn new() -> Self {
        Self { bits: Vec::new() }
    }

    /// 追加 1 个位
    pub(crate) fn push_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// 追加 value 的低 n 位 (大端位序)
    pub(crate) fn push_bits(&mut self, value: u32, n: u32) {
        for i in (0..n).rev() {
            self.bits.push(((value >> i) & 1) != 0);
        }
    }

    /// 追加 1 个字节
    pub(crate) fn push_byte(&mut self, byte: u8) {
        self.push_bits(u32::from(byte), 8);
    }

    /// 写入 ue(v)
    pub(crate) fn write_ue(&mut self, val: u32) {
        if val == 0 {
            self.bits.push(true); // "1"
            return;
        }
        let code = val + 1;
        let num_bits = 32 - code.leading_zeros();
        // 前导零
        for _ in 0..num_bits - 1 {
            self.bits.push(false);
        }
        for i in (0..num_bits).rev() {
            self.bits.push(((code >> i) & 1) != 0);
        }
    }

    pub(crate) fn as_slice(&self) -> &[bool] {
        &self.bits
    }
}

/// 将 bit 向量转为字节 (末尾补零对齐)
pub(crate) fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for chunk in bits.chunks(8) {
        let mut byte = 0u8;
        for (i, &bit) in chunk.iter().enumerate() {
            if bit {
                byte |= 1 << (7 - i);
            }
        }
        bytes.push(byte);
    }
    bytes
}

/// 插入防竞争字节 (`00 00 0X` (X≤3) → `00 00 03 0X`)
pub(crate) fn escape_rbsp(rbsp: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rbsp.len());
    let mut zeros = 0usize;
    for &b in rbsp {
        if zeros >= 2 && b <= 0x03 {
            out.push(0x03);
            zeros = 0;
        }
        out.push(b);
        zeros = if b == 0x00 { zeros + 1 } else { 0 };
    }
    out
}

/// 构造一个带起始码的完整 NAL 单元 (自动转义载荷)
pub(crate) fn annexb_nal(header: u8, rbsp: &[u8], four_byte_start_code: bool) -> Vec<u8> {
    let mut out = Vec::new();
    if four_byte_start_code {
        out.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
    } else {
        out.extend_from_slice(&[0x00, 0x00, 0x01]);
    }
    out.push(header);
    out.extend_from_slice(&escape_rbsp(rbsp));
    out
}

/// 测试用最小 SPS 的可调参数
pub(crate) struct TestSps {
    pub sps_id: u32,
    pub log2_max_frame_num_minus4: u32,
    pub frame_mbs_only: bool,
    /// 生成带 NAL HRD 的 VUI, `pic_struct_present_flag=1`,
    /// CPB/DPB 延迟位宽固定为 8
    pub pic_struct_present: bool,
}

impl Default for TestSps {
    fn default() -> Self {
        Self {
            sps_id: 0,
            log2_max_frame_num_minus4: 0,
            frame_mbs_only: true,
            pic_struct_present: false,
        }
    }
}

/// 构造最小 Baseline SPS RBSP (320x240)
pub(crate) fn build_sps_rbsp(cfg: &TestSps) -> Vec<u8> {
    let mut bits = BitVec::new();
    bits.push_byte(66); // profile_idc = Baseline
    bits.push_byte(0xC0); // constraint_set_flags
    bits.push_byte(30); // level_idc
    bits.write_ue(cfg.sps_id);
    bits.write_ue(cfg.log2_max_frame_num_minus4);
    bits.write_ue(0); // pic_order_cnt_type
    bits.write_ue(0); // log2_max_pic_order_cnt_lsb_minus4
    bits.write_ue(4); // max_num_ref_frames
    bits.push_bit(false); // gaps_in_frame_num_value_allowed_flag
    bits.write_ue(19); // pic_width_in_mbs_minus1: 320
    bits.write_ue(14); // pic_height_in_map_units_minus1: 240
    bits.push_bit(cfg.frame_mbs_only);
    if !cfg.frame_mbs_only {
        bits.push_bit(false); // mb_adaptive_frame_field_flag
    }
    bits.push_bit(false); // direct_8x8_inference_flag
    bits.push_bit(false); // frame_cropping_flag
    if cfg.pic_struct_present {
        bits.push_bit(true); // vui_parameters_present_flag
        bits.push_bit(false); // aspect_ratio_info_present_flag
        bits.push_bit(false); // overscan_info_present_flag
        bits.push_bit(false); // video_signal_type_present_flag
        bits.push_bit(false); // chroma_loc_info_present_flag
        bits.push_bit(false); // timing_info_present_flag
        bits.push_bit(true); // nal_hrd_parameters_present_flag
        bits.write_ue(0); // cpb_cnt_minus1
        bits.push_bits(0, 4); // bit_rate_scale
        bits.push_bits(0, 4); // cpb_size_scale
        bits.write_ue(100); // bit_rate_value_minus1
        bits.write_ue(100); // cpb_size_value_minus1
        bits.push_bit(false); // cbr_flag
        bits.push_bits(7, 5); // initial_cpb_removal_delay_length_minus1
        bits.push_bits(7, 5); // cpb_removal_delay_length_minus1
        bits.push_bits(7, 5); // dpb_output_delay_length_minus1
        bits.push_bits(0, 5); // time_offset_length
        bits.push_bit(false); // vcl_hrd_parameters_present_flag
        bits.push_bit(false); // low_delay_hrd_flag
        bits.push_bit(true); // pic_struct_present_flag
    } else {
        bits.push_bit(false); // vui_parameters_present_flag
    }
    bits_to_bytes(bits.as_slice())
}

/// 构造最小 PPS RBSP
pub(crate) fn build_pps_rbsp(pps_id: u32, sps_id: u32) -> Vec<u8> {
    let mut bits = BitVec::new();
    bits.write_ue(pps_id);
    bits.write_ue(sps_id);
    bits.push_bit(false); // entropy_coding_mode_flag
    bits.push_bit(false); // pic_order_present_flag
    bits.write_ue(0); // num_slice_groups_minus1
    bits.write_ue(0); // num_ref_idx_l0_default_active_minus1
    bits.write_ue(0); // num_ref_idx_l1_default_active_minus1
    bits.push_bit(false); // weighted_pred_flag
    bits.push_bits(0, 2); // weighted_bipred_idc
    bits.write_ue(0); // pic_init_qp_minus26
    bits.write_ue(0); // pic_init_qs_minus26
    bits.write_ue(0); // chroma_qp_index_offset
    bits.push_bit(false); // deblocking_filter_control_present_flag
    bits.push_bit(false); // constrained_intra_pred_flag
    bits.push_bit(false); // redundant_pic_cnt_present_flag
    bits_to_bytes(bits.as_slice())
}

/// 构造 slice header 前缀 RBSP (first_mb / slice_type / pps_id / frame_num)
///
/// `log2_max_frame_num` 必须与对应 SPS 一致; 尾部补若干 1 位模拟载荷.
pub(crate) fn build_slice_rbsp(
    first_mb: u32,
    slice_type: u32,
    pps_id: u32,
    frame_num: u32,
    log2_max_frame_num: u32,
) -> Vec<u8> {
    let mut bits = BitVec::new();
    bits.write_ue(first_mb);
    bits.write_ue(slice_type);
    bits.write_ue(pps_id);
    bits.push_bits(frame_num, log2_max_frame_num);
    // 模拟若干载荷位, 避免 RBSP 过短
    bits.push_bits(0xFFFF, 16);
    bits_to_bytes(bits.as_slice())
}
