//! liu-probe - H.264 裸流探测工具
//!
//! 把 Annex B 裸流文件按指定分片大小送入帧定界器, 逐个报告访问单元
//! 的位置与图像元数据; 可单独探测参数集前导 ("extradata") 的分界.

use clap::Parser;
use serde::Serialize;
use std::fs;
use std::process;

use liu_codec::parsers::h264::{H264Framer, ParseOutput, find_config_boundary};

/// Liu H.264 裸流探测工具
#[derive(Parser, Debug)]
#[command(name = "liu-probe", version, about = "纯 Rust H.264 裸流探测工具")]
struct Cli {
    /// 输入文件路径 (Annex B 裸流)
    input: Option<String>,

    /// 每次送入定界器的分片大小 (字节), 用于模拟分片到达
    #[arg(long, default_value_t = 4096)]
    chunk_size: usize,

    /// 仅探测参数集前导与首个访问单元的分界
    #[arg(long)]
    split: bool,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 静默模式 (只输出探测结果)
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================
// JSON 输出结构体
// ============================================================

/// 完整探测结果
#[derive(Serialize)]
struct ProbeOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_boundary: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<Vec<FrameInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

/// 单个访问单元的信息
#[derive(Serialize)]
struct FrameInfo {
    index: usize,
    offset: usize,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pict_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_frame: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    structure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_num: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repeat_pict: Option<u8>,
}

/// 流级统计
#[derive(Serialize)]
struct Summary {
    total_frames: usize,
    key_frames: usize,
    unclassified: usize,
    sps_count: usize,
    pps_count: usize,
}

// ============================================================
// 主逻辑
// ============================================================

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let Some(input_path) = cli.input.as_ref() else {
        eprintln!("用法: liu-probe <输入文件> [--chunk-size N] [--split] [--json]");
        return;
    };

    if !cli.quiet {
        eprintln!(
            "liu-probe 版本 {} -- 纯 Rust H.264 裸流探测工具",
            env!("CARGO_PKG_VERSION")
        );
        eprintln!("输入文件: {input_path}");
    }

    let data = match fs::read(input_path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("错误: 无法读取文件 '{input_path}': {e}");
            process::exit(1);
        }
    };
    if data.is_empty() {
        eprintln!("错误: 输入文件为空");
        process::exit(1);
    }

    if cli.split {
        let boundary = find_config_boundary(&data);
        if cli.json {
            print_json(&ProbeOutput {
                config_boundary: Some(boundary),
                frames: None,
                summary: None,
            });
        } else {
            println!("参数集前导分界: {boundary} 字节");
        }
        return;
    }

    let chunk_size = if cli.chunk_size == 0 {
        data.len()
    } else {
        cli.chunk_size
    };
    let (frames, sps_count, pps_count) = run_framer(&data, chunk_size);

    let key_frames = frames
        .iter()
        .filter(|f| f.key_frame == Some(true))
        .count();
    let unclassified = frames.iter().filter(|f| f.pict_type.is_none()).count();
    let summary = Summary {
        total_frames: frames.len(),
        key_frames,
        unclassified,
        sps_count,
        pps_count,
    };

    print_frames(&cli, frames, summary);
}

/// 驱动定界器跑完整个文件, 返回 (帧列表, SPS 数, PPS 数)
fn run_framer(data: &[u8], chunk_size: usize) -> (Vec<FrameInfo>, usize, usize) {
    let mut framer = H264Framer::new();
    let mut frames = Vec::new();
    let mut stream_pos = 0usize; // 已交付帧的流内偏移

    for chunk in data.chunks(chunk_size) {
        let mut rest = chunk;
        while !rest.is_empty() {
            match framer.parse(rest) {
                Ok(out) => {
                    let consumed = out.consumed;
                    record_frame(&mut frames, &mut stream_pos, &out);
                    rest = &rest[consumed..];
                }
                Err(e) => {
                    eprintln!("错误: 解析失败: {e}");
                    process::exit(1);
                }
            }
        }
    }

    // 文件结束: 冲刷缓冲中的最后一个访问单元
    match framer.flush() {
        Ok(out) => record_frame(&mut frames, &mut stream_pos, &out),
        Err(e) => {
            eprintln!("错误: 冲刷失败: {e}");
            process::exit(1);
        }
    }

    let params = framer.parameter_sets();
    let counts = (params.sps_count(), params.pps_count());
    (frames, counts.0, counts.1)
}

fn record_frame(frames: &mut Vec<FrameInfo>, stream_pos: &mut usize, out: &ParseOutput) {
    let Some(frame) = out.frame else { return };
    frames.push(FrameInfo {
        index: frames.len(),
        offset: *stream_pos,
        size: frame.len(),
        pict_type: out.picture.as_ref().map(|p| p.pict_type.to_string()),
        key_frame: out.picture.as_ref().map(|p| p.key_frame),
        structure: out.picture.as_ref().map(|p| p.picture_structure.to_string()),
        frame_num: out.picture.as_ref().map(|p| p.frame_num),
        repeat_pict: out.picture.as_ref().map(|p| p.repeat_pict),
    });
    *stream_pos += frame.len();
}

fn print_frames(cli: &Cli, frames: Vec<FrameInfo>, summary: Summary) {
    if cli.json {
        print_json(&ProbeOutput {
            config_boundary: None,
            frames: Some(frames),
            summary: Some(summary),
        });
        return;
    }

    for f in &frames {
        let pict = f.pict_type.as_deref().unwrap_or("?");
        let key = if f.key_frame == Some(true) { " key" } else { "" };
        let structure = f.structure.as_deref().unwrap_or("-");
        println!(
            "frame {:4}  offset={:8}  size={:7}  type={}{}  structure={}  frame_num={}",
            f.index,
            f.offset,
            f.size,
            pict,
            key,
            structure,
            f.frame_num.map_or("-".to_string(), |n| n.to_string()),
        );
    }

    if !cli.quiet {
        eprintln!(
            "共 {} 个访问单元, 关键帧 {}, 未能分类 {}, SPS {}, PPS {}",
            summary.total_frames,
            summary.key_frames,
            summary.unclassified,
            summary.sps_count,
            summary.pps_count
        );
    }
}

fn print_json(output: &ProbeOutput) {
    match serde_json::to_string_pretty(output) {
        Ok(s) => println!("{s}"),
        Err(e) => {
            eprintln!("错误: JSON 序列化失败: {e}");
            process::exit(1);
        }
    }
}
