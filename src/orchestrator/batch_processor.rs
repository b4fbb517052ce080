//! 批量批改处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量作业的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：启动日志、加载评分标准、检查外部工具、创建模型客户端
//! 2. **工具协商**：启动时把工具 schema 一次性交给模型客户端
//! 3. **作业解压**：解压顶层作业包，穿透单层包装目录
//! 4. **学生发现**：扫描解压目录，建立 `Vec<StudentUnit>`
//! 5. **顺序处理**：严格逐个学生处理，单个失败不影响整批
//! 6. **全局统计**：汇总所有学生的处理结果
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个学生的细节
//! - **资源所有者**：唯一持有工具注册表和模型客户端的模块
//! - **向下委托**：委托 student_processor 处理单个学生

use crate::cli::Backend;
use crate::clients::{ModelBackend, ModelClient};
use crate::config::Config;
use crate::error::ConfigError;
use crate::orchestrator::student_processor::{self, StudentOutcome};
use crate::services::SubmissionWalker;
use crate::tools::{ToolRegistry, TOOL_EXTRACT_ARCHIVE};
use crate::utils::logging;
use crate::workflow::{GradingFlow, StudentCtx};
use anyhow::{bail, Context, Result};
use serde_json::{json, Map};
use std::path::Path;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    rubric: String,
    registry: ToolRegistry,
    client: ModelBackend,
}

impl App {
    /// 初始化应用
    ///
    /// 评分标准缺失、外部工具不可用都在这里直接失败，
    /// 不把问题留到批改中途。
    pub fn initialize(config: Config, backend: Backend) -> Result<Self> {
        // 初始化日志文件
        logging::init_log_file(&config.output_log_file)?;

        log_startup(&config, backend);

        // 加载评分标准（启动时一次，之后注入流程层）
        let rubric = std::fs::read_to_string(&config.rubric_path).map_err(|_| {
            ConfigError::RubricNotFound {
                path: config.rubric_path.clone().into(),
            }
        })?;
        info!("✓ 评分标准已加载: {}", config.rubric_path);

        // 创建工具注册表并检查外部解压工具
        let registry = ToolRegistry::new(&config);
        registry.check_external_tools()?;

        // 创建模型客户端并协商工具 schema（每次会话恰好一次）
        let mut client = ModelBackend::from_config(backend, &config);
        client.set_tools(&registry.discover())?;
        info!("✓ 模型后端就绪: {}", client.name());

        Ok(Self {
            config,
            rubric,
            registry,
            client,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self, zip_path: &Path) -> Result<()> {
        // 解压顶层作业包（失败即致命，没有可批改的内容）
        let root = self.extract_submissions(zip_path)?;

        // 发现学生单元
        let walker = SubmissionWalker::new();
        let students = walker.discover_students(&root, &self.registry)?;

        if students.is_empty() {
            warn!("⚠️ 解压目录中没有找到学生文件夹，程序结束");
            return Ok(());
        }

        let total = students.len();
        log_students_found(total, &root);

        // 创建流程对象（只创建一次，整批复用）
        let flow = GradingFlow::new(&self.config, self.rubric.clone(), &self.registry, &self.client);

        let mut stats = BatchStats {
            total,
            ..Default::default()
        };

        // ========== 严格顺序处理所有学生 ==========
        for (index, unit) in students.iter().enumerate() {
            let ctx = StudentCtx::new(index + 1, total);

            match student_processor::process_student(&flow, unit, &ctx).await {
                Ok(StudentOutcome::Graded) => stats.graded += 1,
                Ok(StudentOutcome::Skipped) => stats.skipped += 1,
                Ok(StudentOutcome::Failed) => stats.failed += 1,
                Err(e) => {
                    error!("{} ❌ 处理过程中发生错误: {}", ctx, e);
                    stats.failed += 1;
                }
            }
        }

        // 输出最终统计
        print_final_stats(&stats, &self.config);

        Ok(())
    }

    /// 解压顶层作业包并穿透包装目录，返回学生文件夹所在的根目录
    fn extract_submissions(&self, zip_path: &Path) -> Result<std::path::PathBuf> {
        info!("\n📦 正在解压作业包: {}", zip_path.display());

        let mut params = Map::new();
        params.insert("source_path".to_string(), json!(zip_path.to_string_lossy()));
        params.insert(
            "target_path".to_string(),
            json!(self.config.extract_dir.clone()),
        );

        let result = self
            .registry
            .invoke(TOOL_EXTRACT_ARCHIVE, &params)
            .with_context(|| format!("无法解压作业包: {}", zip_path.display()))?;
        if !result.is_success() {
            bail!("无法解压作业包 {}: {}", zip_path.display(), result.message);
        }
        info!("✓ {}", result.message);

        let walker = SubmissionWalker::new();
        let root = walker.resolve_root(Path::new(&self.config.extract_dir))?;
        Ok(root)
    }
}

/// 批次处理统计
#[derive(Debug, Default)]
struct BatchStats {
    graded: usize,
    skipped: usize,
    failed: usize,
    total: usize,
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config, backend: Backend) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 作业自动批改模式");
    info!("🤖 模型后端: {:?}", backend);
    info!("📊 单个学生最大轮数: {}", config.max_rounds);
    info!("📊 评分范围: {}-{}", config.score_min, config.score_max);
    info!("{}", "=".repeat(60));
}

fn log_students_found(total: usize, root: &Path) {
    info!("✓ 找到 {} 个学生文件夹", total);
    info!("📁 作业根目录: {}", root.display());
    info!("💡 将严格按顺序逐个批改\n");
}

fn print_final_stats(stats: &BatchStats, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部批改完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已批改: {}/{}", stats.graded, stats.total);
    info!("⏭️ 已跳过: {}", stats.skipped);
    info!("❌ 失败: {}", stats.failed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", config.output_log_file);
}
