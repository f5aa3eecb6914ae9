//! 访问单元边界扫描器.
//!
//! 逐字节消费输入, 寻找一个访问单元 (access unit) 结束、下一个开始的
//! 位置. 状态跨调用持久, 因此起始码被任意切分到多次调用也能正确识别.
//!
//! 判定规则 (与 FFmpeg h264 parser 的帧定界行为一致):
//! - 起始码后出现 SPS/PPS/SEI (type 7/8/9), 且本单元内已经见过 slice
//!   起始, 则当前单元在该起始码前结束;
//! - 起始码后出现第二个 slice 类 NAL (type 1/2/5), 还不能立即定界:
//!   需等下一字节的最高位为 1 (`first_mb_in_slice` 的 ue(v) 前缀为
//!   `1`, 即值 0) 才确认这是一个真正的新图像起始, 而非碰巧形似起始码
//!   的载荷字节.
//!
//! 返回的边界偏移可能为负: 表示边界落在此前调用已吸收的字节之内
//! (例如起始码的前导零在上一次输入的末尾).

/// 扫描器状态步骤
///
/// 对齐 FFmpeg 解析器 0..=13 的小整数状态编码, 以具名枚举表达;
/// 定界时需要回退的起始码字节数见 [`ScanStep::start_code_backtrack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ScanStep {
    /// 在载荷字节中扫描, 等待第一个 0x00
    #[default]
    Scanning,
    /// 已看到连续 1 个 0x00
    OneZero,
    /// 已看到连续 2 个 0x00
    TwoZeros,
    /// 已看到连续 3 个及以上 0x00
    ManyZeros,
    /// 刚越过 `00 00 01`, 当前字节是 NAL 头
    StartCodeShort,
    /// 刚越过 `00 00 00 01` (或更多前导零), 当前字节是 NAL 头
    StartCodeLong,
    /// 已看到第二个 slice 起始 (3 字节起始码), 等待确认字节
    PendingEndShort,
    /// 已看到第二个 slice 起始 (4 字节起始码), 等待确认字节
    PendingEndLong,
}

impl ScanStep {
    /// 定界时归属于起始码、需从当前位置回退的字节数
    fn start_code_backtrack(self) -> isize {
        match self {
            Self::StartCodeShort | Self::PendingEndShort => 4,
            Self::StartCodeLong | Self::PendingEndLong => 5,
            _ => 0,
        }
    }
}

/// 边界扫描器状态, 跨调用持久
///
/// 一个实例只服务一条流; 找到边界后自动复位到扫描初态.
#[derive(Debug, Clone, Default)]
pub(crate) struct BoundaryScanner {
    step: ScanStep,
    /// 本单元内是否已记录到 slice 起始
    frame_start_found: bool,
}

/// 词内是否含 0x00 字节 (SWAR 检测)
#[inline]
fn contains_zero_byte(word: u64) -> bool {
    (word.wrapping_sub(0x0101_0101_0101_0101) & !word & 0x8080_8080_8080_8080) != 0
}

impl BoundaryScanner {
    /// 复位到扫描初态
    pub(crate) fn reset(&mut self) {
        self.step = ScanStep::Scanning;
        self.frame_start_found = false;
    }

    /// 在 `buf` 中寻找访问单元边界
    ///
    /// 找到时返回边界相对 `buf` 起点的偏移 (可能为负, 见模块文档),
    /// 并复位状态; 未找到时持久化当前状态并返回 `None`, 下次调用
    /// 从中断处继续.
    pub(crate) fn find_frame_end(&mut self, buf: &[u8]) -> Option<isize> {
        let len = buf.len();
        let mut i = 0usize;

        while i < len {
            match self.step {
                ScanStep::Scanning => {
                    // 快速路径: 8 字节一组跳过不含零字节的区间, 尾部退化为逐字节
                    while let Some(chunk) = buf.get(i..i + 8) {
                        let Ok(bytes) = <[u8; 8]>::try_from(chunk) else {
                            break;
                        };
                        if contains_zero_byte(u64::from_ne_bytes(bytes)) {
                            break;
                        }
                        i += 8;
                    }
                    while i < len && buf[i] != 0x00 {
                        i += 1;
                    }
                    if i < len {
                        self.step = ScanStep::OneZero;
                        i += 1;
                    }
                }
                ScanStep::OneZero | ScanStep::TwoZeros | ScanStep::ManyZeros => {
                    let b = buf[i];
                    self.step = if b == 0x01 {
                        match self.step {
                            // `00 01` 不构成起始码
                            ScanStep::OneZero => ScanStep::Scanning,
                            ScanStep::TwoZeros => ScanStep::StartCodeShort,
                            _ => ScanStep::StartCodeLong,
                        }
                    } else if b != 0x00 {
                        ScanStep::Scanning
                    } else {
                        match self.step {
                            ScanStep::OneZero => ScanStep::TwoZeros,
                            _ => ScanStep::ManyZeros,
                        }
                    };
                    i += 1;
                }
                ScanStep::StartCodeShort | ScanStep::StartCodeLong => {
                    match buf[i] & 0x1F {
                        // SPS/PPS/SEI: 新单元的前导, 结束当前单元
                        7 | 8 | 9 => {
                            if self.frame_start_found {
                                let boundary =
                                    i as isize + 1 - self.step.start_code_backtrack();
                                self.reset();
                                return Some(boundary);
                            }
                            self.step = ScanStep::Scanning;
                        }
                        // slice 类: 第一个记录起始, 第二个进入待定界状态
                        1 | 2 | 5 => {
                            if self.frame_start_found {
                                self.step = if self.step == ScanStep::StartCodeShort {
                                    ScanStep::PendingEndShort
                                } else {
                                    ScanStep::PendingEndLong
                                };
                            } else {
                                self.frame_start_found = true;
                                self.step = ScanStep::Scanning;
                            }
                        }
                        _ => {
                            self.step = ScanStep::Scanning;
                        }
                    }
                    i += 1;
                }
                ScanStep::PendingEndShort | ScanStep::PendingEndLong => {
                    // 最高位为 1 ⇒ first_mb_in_slice==0, 确认新图像起始
                    if buf[i] & 0x80 != 0 {
                        let boundary = i as isize - self.step.start_code_backtrack();
                        self.reset();
                        return Some(boundary);
                    }
                    self.step = ScanStep::Scanning;
                    i += 1;
                }
            }
        }

        None
    }
}
