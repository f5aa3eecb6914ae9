//! Exp-Golomb 编码读取.
//!
//! H.264 头部语法大量使用 Exp-Golomb 可变长编码:
//! - `ue(v)`: 无符号 Exp-Golomb
//! - `se(v)`: 有符号 Exp-Golomb

use liu_core::bitreader::BitReader;
use liu_core::{LiuError, LiuResult};

/// 读取无符号 Exp-Golomb 编码值 ue(v)
pub(crate) fn read_ue(br: &mut BitReader) -> LiuResult<u32> {
    let mut leading_zeros = 0u32;
    loop {
        let bit = br.read_bit()?;
        if bit == 1 {
            break;
        }
        leading_zeros += 1;
        if leading_zeros > 31 {
            return Err(LiuError::InvalidData("H264: Exp-Golomb 前导零过多".into()));
        }
    }

    if leading_zeros == 0 {
        return Ok(0);
    }

    let suffix = br.read_bits(leading_zeros)?;
    Ok((1 << leading_zeros) - 1 + suffix)
}

/// 读取有符号 Exp-Golomb 编码值 se(v)
pub(crate) fn read_se(br: &mut BitReader) -> LiuResult<i32> {
    let code = read_ue(br)?;
    // 映射: 0→0, 1→1, 2→-1, 3→2, 4→-2, ...
    let value = code.div_ceil(2) as i32;
    if code & 1 == 0 { Ok(-value) } else { Ok(value) }
}
