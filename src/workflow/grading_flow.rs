//! 单个学生的批改控制回路 - 流程层
//!
//! 状态机：Init → 等待模型 → 执行工具 → {继续 → 等待模型, 停止, 出错}
//!
//! - Init：校验文件夹命名与可评分内容，非法命名直接写零分报告收场
//! - 等待模型：重新分类 → 构建提示词 → 审计落盘 → 调用模型
//! - 执行工具：只看响应里的第一个工具调用
//!   - write_grading_report → 执行 → 停止
//!   - extract_archive → 执行 → 继续（下一轮从头重读学生目录）
//!   - 其他工具名或没有工具调用 → 出错（这一轮没有可执行指令）
//! - 「继续」有明确的轮数上限，耗尽按出错收场，不允许无界循环

use crate::clients::{ModelClient, ModelResponse};
use crate::config::Config;
use crate::error::AppError;
use crate::models::StudentUnit;
use crate::services::{PromptAudit, PromptBuilder, SubmissionWalker};
use crate::tools::{ToolRegistry, TOOL_EXTRACT_ARCHIVE, TOOL_WRITE_REPORT};
use crate::workflow::student_ctx::StudentCtx;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

/// 控制回路每一轮的裁决
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// 终态：该学生处理完毕
    Stop,
    /// 重新分类并再问一轮模型
    Continue,
    /// 终态：这一轮没有产出可执行指令
    Error(String),
}

/// 单个学生的批改流程
///
/// 不持有全局资源，只依赖业务能力（遍历 / 提示词 / 审计）和
/// 编排层借来的工具注册表与模型客户端。
pub struct GradingFlow<'a, C: ModelClient> {
    walker: SubmissionWalker,
    prompt_builder: PromptBuilder,
    audit: PromptAudit,
    registry: &'a ToolRegistry,
    client: &'a C,
    max_rounds: usize,
    sentinel_score: i64,
    verbose_logging: bool,
}

impl<'a, C: ModelClient> GradingFlow<'a, C> {
    /// 创建批改流程，评分标准由编排层加载后注入
    pub fn new(
        config: &Config,
        rubric: String,
        registry: &'a ToolRegistry,
        client: &'a C,
    ) -> Self {
        Self {
            walker: SubmissionWalker::new(),
            prompt_builder: PromptBuilder::new(rubric, config),
            audit: PromptAudit::new(config.audit_file.clone()),
            registry,
            client,
            max_rounds: config.max_rounds,
            sentinel_score: config.score_min,
            verbose_logging: config.verbose_logging,
        }
    }

    /// 运行控制回路直到终态（Stop 或 Error）
    pub async fn run(&self, unit: &StudentUnit, ctx: &StudentCtx) -> Result<LoopOutcome, AppError> {
        // 幂等短路：已有评分报告的学生不再碰模型和文件系统
        if unit.has_existing_report {
            info!("{} 已存在评分报告，跳过", ctx);
            return Ok(LoopOutcome::Stop);
        }

        // Init：命名非法 → 零分报告 → 停止
        if !unit.identity_valid() {
            warn!("{} 文件夹命名格式错误: {}", ctx, unit.folder_name());
            return self.write_sentinel_report(
                unit,
                &format!(
                    "文件夹命名格式错误：{}，应为「学号_姓名」格式",
                    unit.folder_name()
                ),
            );
        }

        for round in 1..=self.max_rounds {
            // 每一轮都从头重读学生目录，上一轮解压出的文件才会被读到
            let classified = self.walker.classify(unit)?;

            // Init：连压缩包都没有 → 零分报告 → 停止
            if round == 1 && classified.nothing_gradeable() {
                warn!("{} 找不到任何可评分的文件", ctx);
                return self
                    .write_sentinel_report(unit, "找不到 .c/.cpp/.h/.py 文件或压缩包");
            }

            let prompt = self.prompt_builder.build(unit, &classified);
            self.audit.record(unit, round, &prompt)?;
            if self.verbose_logging {
                info!("{} 本轮提示词:\n{}", ctx, prompt);
            } else {
                debug!(
                    "{} 本轮提示词（截断）: {}",
                    ctx,
                    crate::utils::logging::truncate_text(&prompt, 200)
                );
            }

            info!("{} 作业批改中...（第 {}/{} 轮）", ctx, round, self.max_rounds);
            let response = self.client.generate(&prompt).await?;

            match self.execute(ctx, &response)? {
                LoopOutcome::Continue => continue,
                terminal => return Ok(terminal),
            }
        }

        Ok(LoopOutcome::Error(format!(
            "连续 {} 轮后仍未产出评分报告",
            self.max_rounds
        )))
    }

    /// 执行响应中的第一个工具调用并给出本轮裁决
    fn execute(&self, ctx: &StudentCtx, response: &ModelResponse) -> Result<LoopOutcome, AppError> {
        if let Some(err) = &response.error {
            return Ok(LoopOutcome::Error(format!(
                "模型未给出可执行指令: {}",
                err
            )));
        }

        let Some(call) = response.first_tool_call() else {
            let preview = response
                .text
                .as_deref()
                .map(|t| crate::utils::logging::truncate_text(t, 120))
                .unwrap_or_default();
            return Ok(LoopOutcome::Error(format!(
                "模型未请求任何工具调用: {}",
                preview
            )));
        };

        if response.tool_calls.len() > 1 {
            debug!(
                "{} 忽略响应中的另外 {} 个工具调用",
                ctx,
                response.tool_calls.len() - 1
            );
        }

        match call.tool_name.as_str() {
            TOOL_WRITE_REPORT => {
                match self.registry.invoke(TOOL_WRITE_REPORT, &call.parameters) {
                    Ok(result) if result.is_success() => {
                        info!("{} ✓ {}", ctx, result.message);
                        Ok(LoopOutcome::Stop)
                    }
                    Ok(result) => Ok(LoopOutcome::Error(result.message)),
                    Err(e) => Ok(LoopOutcome::Error(e.to_string())),
                }
            }
            TOOL_EXTRACT_ARCHIVE => {
                match self.registry.invoke(TOOL_EXTRACT_ARCHIVE, &call.parameters) {
                    Ok(result) if result.is_success() => {
                        info!("{} ✓ {}", ctx, result.message);
                        Ok(LoopOutcome::Continue)
                    }
                    Ok(result) => Ok(LoopOutcome::Error(result.message)),
                    Err(e) => Ok(LoopOutcome::Error(e.to_string())),
                }
            }
            // 未注册的工具名是协议违规，这一轮按出错收场
            other => Ok(LoopOutcome::Error(format!("模型请求了未知工具: {}", other))),
        }
    }

    /// 写零分报告（命名非法 / 无可评分内容两种退化情况共用）
    fn write_sentinel_report(
        &self,
        unit: &StudentUnit,
        comment: &str,
    ) -> Result<LoopOutcome, AppError> {
        let mut params = Map::new();
        params.insert("student_id".to_string(), json!(unit.student_id));
        params.insert("student_name".to_string(), json!(unit.student_name));
        params.insert("score".to_string(), Value::from(self.sentinel_score));
        params.insert("comments".to_string(), json!(comment));
        params.insert(
            "output_path".to_string(),
            json!(unit.report_path().to_string_lossy()),
        );

        match self.registry.invoke(TOOL_WRITE_REPORT, &params) {
            Ok(result) if result.is_success() => Ok(LoopOutcome::Stop),
            Ok(result) => Ok(LoopOutcome::Error(result.message)),
            Err(e) => Ok(LoopOutcome::Error(e.to_string())),
        }
    }
}
