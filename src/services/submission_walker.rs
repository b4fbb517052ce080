//! 提交内容遍历 - 业务能力层
//!
//! 三件事：
//! 1. 解压后的根目录里层层只有一个子目录时向下穿透（包被一层顶层文件夹包住的情况）
//! 2. 发现学生单元：目录直接收下，压缩包先解压到去掉扩展名的同级目录再收下
//! 3. 对单个学生文件夹做完整递归分类（目录树列表 + 按角色分组的文件内容）

use crate::error::{AppError, FileError};
use crate::models::{ClassifiedFileSet, FileRole, StudentUnit};
use crate::tools::{ToolRegistry, TOOL_EXTRACT_ARCHIVE};
use serde_json::{json, Map};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 单层目录穿透的深度上限，防止病态嵌套
const MAX_DESCENT_DEPTH: usize = 16;

/// 提交内容遍历器
pub struct SubmissionWalker;

impl SubmissionWalker {
    pub fn new() -> Self {
        Self
    }

    /// 穿透只含一个子目录的包装层
    ///
    /// 只在「唯一条目是目录」时继续下降；唯一条目是文件时立刻停止，
    /// 并有深度上限兜底。
    pub fn resolve_root(&self, dir: &Path) -> Result<PathBuf, AppError> {
        if !dir.is_dir() {
            return Err(FileError::DirectoryNotFound {
                path: dir.to_path_buf(),
            }
            .into());
        }

        let mut current = dir.to_path_buf();
        for _ in 0..MAX_DESCENT_DEPTH {
            let entries = sorted_entries(&current)?;
            match entries.as_slice() {
                [only] if only.is_dir() => {
                    debug!("穿透单层包装目录: {}", only.display());
                    current = only.clone();
                }
                _ => break,
            }
        }
        Ok(current)
    }

    /// 发现学生单元
    ///
    /// 目录直接成为候选；压缩包先经注册表解压到同级的去扩展名目录，
    /// 解压失败只记日志跳过该学生，不影响整批。
    pub fn discover_students(
        &self,
        root: &Path,
        registry: &ToolRegistry,
    ) -> Result<Vec<StudentUnit>, AppError> {
        let mut units = Vec::new();

        for entry in sorted_entries(root)? {
            if entry.is_dir() {
                units.push(StudentUnit::from_dir(&entry));
                continue;
            }

            let file_name = entry
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if FileRole::classify(&file_name) != FileRole::Archive {
                debug!("忽略顶层杂项文件: {}", entry.display());
                continue;
            }

            // 学生把整个文件夹打包上交的情况：先解压再当作目录处理
            let target = entry.with_extension("");
            let mut params = Map::new();
            params.insert(
                "source_path".to_string(),
                json!(entry.to_string_lossy()),
            );
            params.insert(
                "target_path".to_string(),
                json!(target.to_string_lossy()),
            );

            match registry.invoke(TOOL_EXTRACT_ARCHIVE, &params) {
                Ok(result) if result.is_success() => {
                    info!("已解压学生压缩包: {}", entry.display());
                    units.push(StudentUnit::from_dir(&target));
                }
                Ok(result) => {
                    warn!(
                        "无法解压学生压缩包 {}，已跳过: {}",
                        entry.display(),
                        result.message
                    );
                }
                Err(e) => {
                    warn!("无法解压学生压缩包 {}，已跳过: {}", entry.display(), e);
                }
            }
        }

        Ok(units)
    }

    /// 对学生文件夹做完整递归分类
    ///
    /// 每一轮控制回路都从头重建，保证新解压出来的文件被读到。
    pub fn classify(&self, unit: &StudentUnit) -> Result<ClassifiedFileSet, AppError> {
        let mut set = ClassifiedFileSet::default();
        self.visit(&unit.root_path, &unit.root_path, &mut set)?;
        Ok(set)
    }

    fn visit(
        &self,
        dir: &Path,
        root: &Path,
        set: &mut ClassifiedFileSet,
    ) -> Result<(), AppError> {
        for entry in sorted_entries(dir)? {
            let relative = entry
                .strip_prefix(root)
                .unwrap_or(&entry)
                .to_string_lossy()
                .to_string();

            if entry.is_dir() {
                set.listing.push(format!("📁 {}/", relative));
                // 符号链接目录只列出不进入，防止链接环导致无界递归
                if is_symlink(&entry) {
                    debug!("不进入符号链接目录: {}", entry.display());
                    continue;
                }
                self.visit(&entry, root, set)?;
                continue;
            }

            set.listing.push(format!("📄 {}", relative));

            let file_name = entry
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            match FileRole::classify(&file_name) {
                FileRole::Archive => set.archives.push(relative),
                role => {
                    let content = read_text_content(&entry);
                    let pair = (relative, content);
                    match role {
                        FileRole::CSource => set.c_files.push(pair),
                        FileRole::Header => set.header_files.push(pair),
                        FileRole::CppSource => set.cpp_files.push(pair),
                        FileRole::Python => set.python_files.push(pair),
                        FileRole::Makefile => set.makefile_files.push(pair),
                        FileRole::Other => set.other_files.push(pair),
                        FileRole::Archive => unreachable!(),
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for SubmissionWalker {
    fn default() -> Self {
        Self::new()
    }
}

/// 条目本身是否是符号链接（`is_dir` 会跟随链接，这里看链接自身）
fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// 按文件名排序的目录条目，保证遍历顺序确定
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let read_dir = fs::read_dir(dir).map_err(|e| FileError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut entries: Vec<PathBuf> = read_dir
        .filter_map(|entry| match entry {
            Ok(e) => Some(e.path()),
            Err(e) => {
                warn!("读取目录条目失败，已跳过: {}", e);
                None
            }
        })
        .collect();
    entries.sort();
    Ok(entries)
}

/// 读取文本内容：严格 UTF-8 → 一次宽松解码 → 占位标记
///
/// 含 NUL 字节的文件按二进制对待，只留占位，不读内容。
fn read_text_content(path: &Path) -> String {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => return format!("(无法读取：{})", e),
    };

    if bytes.contains(&0) {
        return "(二进制文件)".to_string();
    }

    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            debug!("UTF-8 解码失败 {}，改用宽松解码", path.display());
            String::from_utf8_lossy(e.as_bytes()).to_string()
        }
    }
}
