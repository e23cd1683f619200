// ==========================================
// 青少年科创竞赛管理系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository错误为用户友好的错误消息
// 红线: 所有拒绝必须携带显式原因（可解释性）
// ==========================================

use crate::engine::composition::CompositionReport;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须包含显式原因（可解释性红线）
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    /// 构成校验未通过（携带字段级报告，供前台逐项展示）
    #[error("队伍构成校验未通过: {} 项问题", .report.issue_count())]
    ValidationFailed { report: CompositionReport },

    /// 名额容量已满（业务判定，非并发冲突）
    #[error("报名容量已满: {0}")]
    CapacityExceeded(String),

    /// 名额竞争冲突（存储层唯一索引拦截，可重试）
    #[error("名额竞争冲突（可重试）: {0}")]
    CapacityRace(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 配置错误
    // ==========================================
    /// 配置缺失或不可解析（容量上限等关键配置缺失时拒绝操作）
    #[error("配置错误: {0}")]
    ConfigurationError(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    /// 批量操作中单项事务失败（correlation_id 用于对账排查）
    #[error("事务失败 (correlation_id={correlation_id}): {reason}")]
    TransactionFailure {
        correlation_id: String,
        reason: String,
    },

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 是否属于可重试错误（调用方可原样重放请求）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::CapacityRace(_) | ApiError::DatabaseConnectionError(_)
        )
    }
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseError(format!("事务执行失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),

            // 名额竞争: 部分唯一索引拦截并发重复报名, 映射为可重试错误
            RepositoryError::UniqueConstraintViolation(msg) => ApiError::CapacityRace(msg),
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            // 业务规则错误
            RepositoryError::BusinessRuleViolation(msg) => {
                if msg.contains("容量") || msg.contains("满员") {
                    ApiError::CapacityExceeded(msg)
                } else {
                    ApiError::BusinessRuleViolation(msg)
                }
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => {
                ApiError::DatabaseError(format!("数据校验失败: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
