//! 统一错误类型定义.
//!
//! 所有 Liu crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// Liu 框架统一错误类型
#[derive(Debug, Error)]
pub enum LiuError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 切片引用了未知或越界的参数集
    #[error("引用了未知参数集: {0}")]
    UnknownParameterSet(String),

    /// 访问单元中没有可分类的图像切片
    #[error("访问单元中未找到图像切片")]
    NoPictureFound,

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 超出内存上限
    #[error("超出内存上限: {0}")]
    OutOfMemory(String),
}

/// Liu 框架统一 Result 类型
pub type LiuResult<T> = Result<T, LiuError>;
