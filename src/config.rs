/// 程序配置文件
///
/// 默认值 < 配置文件（TOML）< 环境变量，逐层覆盖。
/// 重试次数、循环上限、评分范围、评分标准路径全部走配置，不写死在代码里。
use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

#[derive(Clone, Debug)]
pub struct Config {
    /// 作业解压目标目录
    pub extract_dir: String,
    /// 评分标准文件路径（启动时加载一次，缺失即致命）
    pub rubric_path: String,
    /// 提示词审计日志文件（记录每轮发送的完整提示词）
    pub audit_file: String,
    /// 输出日志文件
    pub output_log_file: String,
    /// 单个学生允许的最大「继续」轮数
    pub max_rounds: usize,
    /// 模型结构化输出异常时的重试次数
    pub model_retries: usize,
    /// 评分范围下限
    pub score_min: i64,
    /// 评分范围上限
    pub score_max: i64,
    /// 外部 RAR 解压工具路径（未配置则不支持 RAR）
    pub unrar_tool: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- Gemini 后端配置 ---
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    pub gemini_model: String,
    // --- Ollama 后端配置 ---
    pub ollama_host: String,
    pub ollama_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extract_dir: "assignments/graded_homework".to_string(),
            rubric_path: "prompt/system_prompt.txt".to_string(),
            audit_file: "prompt_audit.txt".to_string(),
            output_log_file: "output.txt".to_string(),
            max_rounds: 5,
            model_retries: 3,
            score_min: 0,
            score_max: 100,
            unrar_tool: None,
            verbose_logging: false,
            gemini_api_key: String::new(),
            gemini_api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            ollama_model: "qwen3:32b".to_string(),
        }
    }
}

/// 配置文件（TOML）中允许出现的字段，全部可选
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    extract_dir: Option<String>,
    rubric_path: Option<String>,
    audit_file: Option<String>,
    output_log_file: Option<String>,
    max_rounds: Option<usize>,
    model_retries: Option<usize>,
    score_min: Option<i64>,
    score_max: Option<i64>,
    unrar_tool: Option<String>,
    verbose_logging: Option<bool>,
    gemini_api_key: Option<String>,
    gemini_api_base: Option<String>,
    gemini_model: Option<String>,
    ollama_host: Option<String>,
    ollama_model: Option<String>,
}

impl Config {
    /// 加载配置：默认值 → 可选 TOML 配置文件 → 环境变量
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = config_file {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::ConfigFileInvalid {
                    path: path.to_path_buf(),
                    source: Box::new(e),
                })?;
            let file: ConfigFile =
                toml::from_str(&content).map_err(|e| ConfigError::ConfigFileInvalid {
                    path: path.to_path_buf(),
                    source: Box::new(e),
                })?;
            config = config.apply_file(file);
        }
        Ok(config.apply_env())
    }

    fn apply_file(mut self, file: ConfigFile) -> Self {
        macro_rules! take {
            ($field:ident) => {
                if let Some(v) = file.$field {
                    self.$field = v;
                }
            };
        }
        take!(extract_dir);
        take!(rubric_path);
        take!(audit_file);
        take!(output_log_file);
        take!(max_rounds);
        take!(model_retries);
        take!(score_min);
        take!(score_max);
        take!(verbose_logging);
        take!(gemini_api_key);
        take!(gemini_api_base);
        take!(gemini_model);
        take!(ollama_host);
        take!(ollama_model);
        if file.unrar_tool.is_some() {
            self.unrar_tool = file.unrar_tool;
        }
        self
    }

    fn apply_env(mut self) -> Self {
        self.extract_dir = std::env::var("EXTRACT_DIR").unwrap_or(self.extract_dir);
        self.rubric_path = std::env::var("RUBRIC_PATH").unwrap_or(self.rubric_path);
        self.audit_file = std::env::var("AUDIT_FILE").unwrap_or(self.audit_file);
        self.output_log_file = std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file);
        self.max_rounds = std::env::var("MAX_ROUNDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.max_rounds);
        self.model_retries = std::env::var("MODEL_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.model_retries);
        self.score_min = std::env::var("SCORE_MIN")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.score_min);
        self.score_max = std::env::var("SCORE_MAX")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.score_max);
        self.unrar_tool = std::env::var("UNRAR_TOOL").ok().or(self.unrar_tool);
        self.verbose_logging = std::env::var("VERBOSE_LOGGING")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.verbose_logging);
        self.gemini_api_key = std::env::var("GEMINI_API_KEY").unwrap_or(self.gemini_api_key);
        self.gemini_api_base = std::env::var("GEMINI_API_BASE").unwrap_or(self.gemini_api_base);
        self.gemini_model = std::env::var("GEMINI_MODEL_NAME").unwrap_or(self.gemini_model);
        self.ollama_host = std::env::var("OLLAMA_HOST").unwrap_or(self.ollama_host);
        self.ollama_model = std::env::var("OLLAMA_MODEL_NAME").unwrap_or(self.ollama_model);
        self
    }
}
