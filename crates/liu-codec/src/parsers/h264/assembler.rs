//! 跨调用帧重组缓冲.
//!
//! 扫描器未定界时, 输入被整体吸收进缓冲; 定界后, 缓冲与当前输入的
//! 前缀拼接成完整帧交付. 交付的帧借用内部存储, 在下一次调用前有效,
//! 下一次调用开始时才真正丢弃 (延迟排空).
//!
//! 边界为负偏移时, 完整帧整个落在缓冲内部, 缓冲尾部余下的字节属于
//! 下一个单元, 由调用方对其做扫描器状态回放.

use liu_core::{LiuError, LiuResult};

/// 重组缓冲上限.
///
/// 一条始终不出现边界的流会让缓冲无限增长; 超过该上限视为损坏的流,
/// 返回错误而不是耗尽内存.
pub(crate) const MAX_ASSEMBLY_SIZE: usize = 16 * 1024 * 1024;

/// 跨调用帧重组缓冲
#[derive(Debug, Default)]
pub(crate) struct FrameAssembler {
    buffer: Vec<u8>,
    /// 缓冲前缀中已作为完整帧交付的字节数, 下一次调用时排空
    delivered: usize,
}

impl FrameAssembler {
    /// 丢弃上一次调用交付的帧前缀
    pub(crate) fn discard_delivered(&mut self) {
        if self.delivered > 0 {
            self.buffer.drain(..self.delivered);
            self.delivered = 0;
        }
    }

    /// 无边界: 吸收整个输入, 等待后续调用
    pub(crate) fn absorb(&mut self, input: &[u8]) -> LiuResult<()> {
        if self.buffer.len() + input.len() > MAX_ASSEMBLY_SIZE {
            return Err(LiuError::OutOfMemory(format!(
                "H264: 重组缓冲超过上限 {} 字节, 流中始终未出现访问单元边界",
                MAX_ASSEMBLY_SIZE
            )));
        }
        self.buffer.extend_from_slice(input);
        Ok(())
    }

    /// 边界在当前输入内 (offset ≥ 0): 拼接缓冲与输入前缀, 交付完整帧
    ///
    /// 缓冲为空时直接借用输入切片, 不产生拷贝.
    pub(crate) fn complete_forward<'a>(&'a mut self, input: &'a [u8], take: usize) -> &'a [u8] {
        if self.buffer.is_empty() {
            return &input[..take];
        }
        self.buffer.extend_from_slice(&input[..take]);
        self.delivered = self.buffer.len();
        &self.buffer[..]
    }

    /// 边界在已吸收字节内 (offset < 0): 交付缓冲前缀, 返回 (帧, 尾部)
    ///
    /// 尾部字节属于下一个单元, 供调用方做扫描器状态回放.
    /// 越界的负偏移返回错误, 绝不越过缓冲起点读取.
    pub(crate) fn complete_backward(&mut self, offset: isize) -> LiuResult<(&[u8], &[u8])> {
        let frame_len = self
            .buffer
            .len()
            .checked_add_signed(offset)
            .filter(|len| *len <= self.buffer.len())
            .ok_or_else(|| {
                LiuError::InvalidData(format!(
                    "H264: 边界偏移 {} 超出重组缓冲范围 (len={})",
                    offset,
                    self.buffer.len()
                ))
            })?;
        self.delivered = frame_len;
        Ok(self.buffer.split_at(frame_len))
    }

    /// 有效 (未交付) 的待重组字节数
    pub(crate) fn pending(&self) -> usize {
        self.buffer.len() - self.delivered
    }

    /// 释放缓冲
    pub(crate) fn reset(&mut self) {
        self.buffer = Vec::new();
        self.delivered = 0;
    }
}
