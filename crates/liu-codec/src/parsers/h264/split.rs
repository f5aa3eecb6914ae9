//! 参数集前导与首个访问单元的分界扫描.
//!
//! 解复用场景下, 码流开头往往是一段 SPS/PPS (可作为 "extradata"
//! 单独取走), 之后才是第一个访问单元. 本模块单趟扫描找到这条分界,
//! 无状态, 与定界器互不相干.

/// 查找参数集前导数据与首个访问单元的分界
///
/// 维护最近 4 字节的滚动窗口: 见过 SPS 起始码之后, 首个类型不属于
/// SPS/PPS/AUD 的起始码即为分界; 起始码前紧邻的零填充字节一并划入
/// 后半段 (向前修剪, 不越过缓冲起点). 返回分界相对缓冲起点的偏移,
/// 未找到时返回 0.
pub fn find_config_boundary(buf: &[u8]) -> usize {
    let mut state: u32 = u32::MAX;
    let mut has_sps = false;

    for i in 0..=buf.len() {
        // 窗口形如 00 00 01 XX 时, XX 的低 5 位是 NAL 类型
        if state & 0xFFFF_FF1F == 0x107 {
            has_sps = true;
        }
        if state & 0xFFFF_FF00 == 0x100 {
            let nal_type = state & 0x1F;
            if has_sps && nal_type != 7 && nal_type != 8 && nal_type != 9 {
                let mut end = i;
                while end > 4 && buf[end - 5] == 0x00 {
                    end -= 1;
                }
                return end - 4;
            }
        }
        if i < buf.len() {
            state = (state << 8) | u32::from(buf[i]);
        }
    }

    0
}
