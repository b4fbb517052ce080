//! 压缩包解压 - 工具实现
//!
//! ZIP 用 zip crate 逐条目解压，单个条目失败只记日志跳过，不中断整个包；
//! RAR 调用配置的外部解压工具。

use super::ToolResult;
use std::fs::{self, File};
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// 解压压缩包到目标目录（目录不存在时先创建）
pub(crate) fn extract_archive(
    source: &Path,
    target: &Path,
    unrar_tool: Option<&str>,
) -> ToolResult {
    if !source.exists() {
        return ToolResult::failure(format!("找不到来源压缩包: {}", source.display()));
    }

    if let Err(e) = fs::create_dir_all(target) {
        return ToolResult::failure(format!(
            "无法创建目标目录 {}: {}",
            target.display(),
            e
        ));
    }

    let extension = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "zip" => extract_zip(source, target),
        "rar" => extract_rar(source, target, unrar_tool),
        _ => ToolResult::failure(format!("不支持的压缩包格式: {}", source.display())),
    }
}

/// ZIP 解压：逐条目处理，坏条目跳过
fn extract_zip(source: &Path, target: &Path) -> ToolResult {
    let file = match File::open(source) {
        Ok(f) => f,
        Err(e) => {
            return ToolResult::failure(format!("无法打开压缩包 {}: {}", source.display(), e))
        }
    };

    let mut archive = match zip::ZipArchive::new(file) {
        Ok(a) => a,
        Err(e) => {
            return ToolResult::failure(format!("无法读取压缩包 {}: {}", source.display(), e))
        }
    };

    let total = archive.len();
    let mut extracted = 0usize;
    let mut skipped = 0usize;

    for i in 0..total {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("解压条目 #{} 时发生错误，已跳过: {}", i, e);
                skipped += 1;
                continue;
            }
        };

        // enclosed_name 会拒绝越界路径（zip slip），当作坏条目跳过
        let Some(relative) = entry.enclosed_name() else {
            warn!("条目 {} 路径非法，已跳过", entry.name());
            skipped += 1;
            continue;
        };
        let out_path = target.join(relative);

        let result = if entry.is_dir() {
            fs::create_dir_all(&out_path).map(|_| 0u64)
        } else {
            out_path
                .parent()
                .map(fs::create_dir_all)
                .unwrap_or(Ok(()))
                .and_then(|_| {
                    let mut out_file = File::create(&out_path)?;
                    std::io::copy(&mut entry, &mut out_file)
                })
        };

        match result {
            Ok(_) => {
                debug!("已解压: {}", out_path.display());
                extracted += 1;
            }
            Err(e) => {
                warn!("解压条目 {} 时发生错误，已跳过: {}", out_path.display(), e);
                skipped += 1;
            }
        }
    }

    ToolResult::success(format!(
        "已将 {} 解压到 {}（条目 {}/{}，跳过 {}）",
        source.display(),
        target.display(),
        extracted,
        total,
        skipped
    ))
}

/// RAR 解压：调用外部工具
fn extract_rar(source: &Path, target: &Path, unrar_tool: Option<&str>) -> ToolResult {
    let Some(tool) = unrar_tool else {
        return ToolResult::failure(format!(
            "未配置外部 RAR 解压工具，无法处理 {}",
            source.display()
        ));
    };

    // unrar x -o+ <archive> <target/>：解压并覆盖已有文件
    let output = Command::new(tool)
        .arg("x")
        .arg("-o+")
        .arg(source)
        .arg(target)
        .output();

    match output {
        Ok(out) if out.status.success() => ToolResult::success(format!(
            "已将 {} 解压到 {}",
            source.display(),
            target.display()
        )),
        Ok(out) => ToolResult::failure(format!(
            "外部解压工具执行失败 ({}): {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )),
        Err(e) => ToolResult::failure(format!("无法启动外部解压工具 {}: {}", tool, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn make_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extract_zip_creates_target_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("hw.zip");
        make_zip(
            &zip_path,
            &[("main.c", "int main() {}"), ("sub/util.h", "#pragma once")],
        );

        let target = dir.path().join("out");
        let result = extract_archive(&zip_path, &target, None);

        assert!(result.is_success(), "{}", result.message);
        assert_eq!(
            fs::read_to_string(target.join("main.c")).unwrap(),
            "int main() {}"
        );
        assert!(target.join("sub/util.h").exists());
    }

    #[test]
    fn test_extract_zip_skips_bad_entry_keeps_rest() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("hw.zip");
        // 越界路径条目会被 enclosed_name 拒绝并跳过，其余照常解压
        make_zip(
            &zip_path,
            &[("../evil.txt", "nope"), ("ok.c", "int x;"), ("also_ok.py", "pass")],
        );

        let target = dir.path().join("out");
        let result = extract_archive(&zip_path, &target, None);

        assert!(result.is_success());
        assert!(target.join("ok.c").exists());
        assert!(target.join("also_ok.py").exists());
        assert!(!dir.path().join("evil.txt").exists());
    }

    #[test]
    fn test_extract_missing_source_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = extract_archive(
            &dir.path().join("不存在.zip"),
            &dir.path().join("out"),
            None,
        );
        assert!(!result.is_success());
    }

    #[test]
    fn test_extract_unsupported_format_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hw.7z");
        fs::write(&path, b"not really").unwrap();
        let result = extract_archive(&path, &dir.path().join("out"), None);
        assert!(!result.is_success());
    }

    #[test]
    fn test_extract_rar_without_tool_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hw.rar");
        fs::write(&path, b"rar bytes").unwrap();
        let result = extract_archive(&path, &dir.path().join("out"), None);
        assert!(!result.is_success());
    }
}
