//! 批改控制回路的端到端测试
//!
//! 用脚本化的模型客户端代替真实后端，逐条验证终态行为：
//! 幂等短路、非法命名、单轮批改、解压后再批改、轮数上限。

use grading_agent::cli::Backend;
use grading_agent::clients::{ModelClient, ModelResponse, ToolCall};
use grading_agent::config::Config;
use grading_agent::error::AppError;
use grading_agent::models::{StudentUnit, GRADING_REPORT_FILE};
use grading_agent::tools::{ToolRegistry, ToolSchema, TOOL_EXTRACT_ARCHIVE, TOOL_WRITE_REPORT};
use grading_agent::workflow::{GradingFlow, LoopOutcome, StudentCtx};
use serde_json::{json, Map};
use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// 按预先写好的剧本逐轮应答的模型客户端
struct ScriptedClient {
    responses: Mutex<VecDeque<ModelResponse>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ModelClient for ScriptedClient {
    fn set_tools(&mut self, _schemas: &[ToolSchema]) -> Result<(), AppError> {
        Ok(())
    }

    fn generate(
        &self,
        _prompt: &str,
    ) -> impl std::future::Future<Output = Result<ModelResponse, AppError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ModelResponse::text_only("剧本已耗尽"));
        async move { Ok(response) }
    }
}

fn test_config(audit_dir: &Path) -> Config {
    let mut config = Config::default();
    config.audit_file = audit_dir
        .join("prompt_audit.txt")
        .to_string_lossy()
        .to_string();
    config
}

fn tool_call(name: &str, params: Map<String, serde_json::Value>) -> ModelResponse {
    ModelResponse {
        text: None,
        tool_calls: vec![ToolCall {
            tool_name: name.to_string(),
            parameters: params,
        }],
        error: None,
    }
}

fn report_call(unit: &StudentUnit, score: i64, comments: &str) -> ModelResponse {
    let mut params = Map::new();
    params.insert("student_id".into(), json!(unit.student_id));
    params.insert("student_name".into(), json!(unit.student_name));
    params.insert("score".into(), json!(score));
    params.insert("comments".into(), json!(comments));
    params.insert(
        "output_path".into(),
        json!(unit.report_path().to_string_lossy()),
    );
    tool_call(TOOL_WRITE_REPORT, params)
}

async fn run_flow(
    config: &Config,
    client: &ScriptedClient,
    unit: &StudentUnit,
) -> LoopOutcome {
    let registry = ToolRegistry::new(config);
    let flow = GradingFlow::new(config, "按正确性评分".to_string(), &registry, client);
    let ctx = StudentCtx::new(1, 1);
    flow.run(unit, &ctx).await.expect("控制回路不应报基础设施错误")
}

#[tokio::test]
async fn test_existing_report_skips_without_model_call() {
    let dir = tempfile::tempdir().unwrap();
    let student_dir = dir.path().join("A001_张三");
    fs::create_dir(&student_dir).unwrap();
    fs::write(student_dir.join(GRADING_REPORT_FILE), "旧报告").unwrap();

    let config = test_config(dir.path());
    let client = ScriptedClient::new(vec![]);
    let unit = StudentUnit::from_dir(&student_dir);

    let outcome = run_flow(&config, &client, &unit).await;

    assert_eq!(outcome, LoopOutcome::Stop);
    assert_eq!(client.call_count(), 0);
    // 已有的报告不允许被覆盖
    let content = fs::read_to_string(student_dir.join(GRADING_REPORT_FILE)).unwrap();
    assert_eq!(content, "旧报告");
}

#[tokio::test]
async fn test_invalid_folder_name_writes_sentinel_report() {
    let dir = tempfile::tempdir().unwrap();
    let student_dir = dir.path().join("没有底线分隔");
    fs::create_dir(&student_dir).unwrap();
    fs::write(student_dir.join("main.c"), "int main(){}").unwrap();

    let config = test_config(dir.path());
    let client = ScriptedClient::new(vec![]);
    let unit = StudentUnit::from_dir(&student_dir);

    let outcome = run_flow(&config, &client, &unit).await;

    assert_eq!(outcome, LoopOutcome::Stop);
    // 命名非法不需要问模型，直接写零分报告
    assert_eq!(client.call_count(), 0);
    let content = fs::read_to_string(student_dir.join(GRADING_REPORT_FILE)).unwrap();
    assert!(content.contains("分数：0"));
    assert!(content.contains("命名格式错误"));
}

#[tokio::test]
async fn test_empty_folder_writes_sentinel_report() {
    let dir = tempfile::tempdir().unwrap();
    let student_dir = dir.path().join("C003_王五");
    fs::create_dir(&student_dir).unwrap();

    let config = test_config(dir.path());
    let client = ScriptedClient::new(vec![]);
    let unit = StudentUnit::from_dir(&student_dir);

    let outcome = run_flow(&config, &client, &unit).await;

    assert_eq!(outcome, LoopOutcome::Stop);
    assert_eq!(client.call_count(), 0);
    let content = fs::read_to_string(student_dir.join(GRADING_REPORT_FILE)).unwrap();
    assert!(content.contains("学号：C003"));
    assert!(content.contains("分数：0"));
}

#[tokio::test]
async fn test_single_round_grading() {
    let dir = tempfile::tempdir().unwrap();
    let student_dir = dir.path().join("A001_张三");
    fs::create_dir(&student_dir).unwrap();
    fs::write(student_dir.join("main.c"), "int main() { return 0; }").unwrap();

    let config = test_config(dir.path());
    let unit = StudentUnit::from_dir(&student_dir);
    let client = ScriptedClient::new(vec![report_call(&unit, 85, "逻辑正确，缺少注释")]);

    let outcome = run_flow(&config, &client, &unit).await;

    assert_eq!(outcome, LoopOutcome::Stop);
    assert_eq!(client.call_count(), 1);
    let content = fs::read_to_string(unit.report_path()).unwrap();
    assert!(content.contains("学号：A001"));
    assert!(content.contains("姓名：张三"));
    assert!(content.contains("分数：85"));
    assert!(content.contains("逻辑正确，缺少注释"));
}

#[tokio::test]
async fn test_extract_then_grade() {
    let dir = tempfile::tempdir().unwrap();
    let student_dir = dir.path().join("B002_李四");
    fs::create_dir(&student_dir).unwrap();

    // 学生只交了一个内层压缩包，没有任何裸的源代码文件
    let inner_zip = student_dir.join("作业.zip");
    let file = fs::File::create(&inner_zip).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    writer
        .start_file("prog.c", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"int main() { return 42; }").unwrap();
    writer.finish().unwrap();

    let config = test_config(dir.path());
    let unit = StudentUnit::from_dir(&student_dir);

    let target = student_dir.join("extracted");
    let mut extract_params = Map::new();
    extract_params.insert("source_path".into(), json!(inner_zip.to_string_lossy()));
    extract_params.insert("target_path".into(), json!(target.to_string_lossy()));

    // 第一轮解压，第二轮重新分类后能看到 prog.c 并给分
    let client = ScriptedClient::new(vec![
        tool_call(TOOL_EXTRACT_ARCHIVE, extract_params),
        report_call(&unit, 90, "正确"),
    ]);

    let outcome = run_flow(&config, &client, &unit).await;

    assert_eq!(outcome, LoopOutcome::Stop);
    assert_eq!(client.call_count(), 2);
    assert!(target.join("prog.c").exists());
    let content = fs::read_to_string(unit.report_path()).unwrap();
    assert!(content.contains("分数：90"));
}

#[tokio::test]
async fn test_no_tool_call_is_terminal_error() {
    let dir = tempfile::tempdir().unwrap();
    let student_dir = dir.path().join("A001_张三");
    fs::create_dir(&student_dir).unwrap();
    fs::write(student_dir.join("main.py"), "print('hi')").unwrap();

    let config = test_config(dir.path());
    let unit = StudentUnit::from_dir(&student_dir);
    let client = ScriptedClient::new(vec![ModelResponse::text_only("这份作业写得不错。")]);

    let outcome = run_flow(&config, &client, &unit).await;

    assert!(matches!(outcome, LoopOutcome::Error(_)));
    assert_eq!(client.call_count(), 1);
    assert!(!unit.report_path().exists());
}

#[tokio::test]
async fn test_retry_exhausted_response_is_terminal_error() {
    let dir = tempfile::tempdir().unwrap();
    let student_dir = dir.path().join("F006_孙八");
    fs::create_dir(&student_dir).unwrap();
    fs::write(student_dir.join("main.c"), "int main(){}").unwrap();

    let config = test_config(dir.path());
    let unit = StudentUnit::from_dir(&student_dir);

    // 后端重试耗尽时返回带错误指示、不含工具调用的响应
    let client = ScriptedClient::new(vec![ModelResponse::exhausted(
        "重试 3 次后仍无法获得结构化输出",
    )]);

    let outcome = run_flow(&config, &client, &unit).await;

    assert!(matches!(outcome, LoopOutcome::Error(_)));
    assert_eq!(client.call_count(), 1);
    assert!(!unit.report_path().exists());
}

#[tokio::test]
async fn test_unknown_tool_name_is_terminal_error() {
    let dir = tempfile::tempdir().unwrap();
    let student_dir = dir.path().join("E005_陈七");
    fs::create_dir(&student_dir).unwrap();
    fs::write(student_dir.join("main.c"), "int main(){}").unwrap();

    let config = test_config(dir.path());
    let unit = StudentUnit::from_dir(&student_dir);

    // 模型请求了注册表里不存在的工具，属于协议违规
    let mut params = Map::new();
    params.insert("path".into(), json!("/tmp"));
    let client = ScriptedClient::new(vec![tool_call("delete_everything", params)]);

    let outcome = run_flow(&config, &client, &unit).await;

    assert!(matches!(outcome, LoopOutcome::Error(_)));
    assert_eq!(client.call_count(), 1);
    assert!(!unit.report_path().exists());
}

#[tokio::test]
async fn test_round_cap_bounds_the_loop() {
    let dir = tempfile::tempdir().unwrap();
    let student_dir = dir.path().join("D004_赵六");
    fs::create_dir(&student_dir).unwrap();
    fs::write(student_dir.join("main.cpp"), "int main(){}").unwrap();

    // 每一轮都成功解压同一个包但始终不写报告，循环只能靠轮数上限收场
    let repeat_zip = student_dir.join("附件.zip");
    let file = fs::File::create(&repeat_zip).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    writer
        .start_file("note.txt", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"nothing here").unwrap();
    writer.finish().unwrap();

    let mut config = test_config(dir.path());
    config.max_rounds = 3;
    let unit = StudentUnit::from_dir(&student_dir);

    let make_extract = || {
        let mut params = Map::new();
        params.insert("source_path".into(), json!(repeat_zip.to_string_lossy()));
        params.insert(
            "target_path".into(),
            json!(student_dir.join("out").to_string_lossy()),
        );
        tool_call(TOOL_EXTRACT_ARCHIVE, params)
    };
    let client = ScriptedClient::new(vec![make_extract(), make_extract(), make_extract()]);

    let outcome = run_flow(&config, &client, &unit).await;

    assert!(matches!(outcome, LoopOutcome::Error(_)));
    assert_eq!(client.call_count(), 3);
    assert!(!unit.report_path().exists());
}

#[tokio::test]
async fn test_backend_value_enum_names() {
    // 命令行的后端名是对外接口，改名会破坏既有脚本
    use clap::ValueEnum;
    assert_eq!(
        Backend::value_variants().len(),
        2,
        "后端集合只有 gemini 和 ollama"
    );
}
