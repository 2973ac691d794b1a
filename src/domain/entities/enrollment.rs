use crate::domain::value_objects::enrollment_status::EnrollmentStatus;
use serde::{Deserialize, Serialize};

/// 受講登録エンティティ
///
/// (user_id, course_id) ごとに一意。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    /// 受講者のユーザーID
    pub user_id: u64,

    /// コースID
    pub course_id: u64,

    /// 登録状態
    pub status: EnrollmentStatus,

    /// 所属グループID（グループ未所属の場合はNone）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u64>,
}

impl Enrollment {
    /// 新しいPENDING状態のEnrollmentを作成
    pub fn pending(user_id: u64, course_id: u64) -> Self {
        Self {
            user_id,
            course_id,
            status: EnrollmentStatus::Pending,
            group_id: None,
        }
    }

    /// 状態を設定
    pub fn with_status(mut self, status: EnrollmentStatus) -> Self {
        self.status = status;
        self
    }

    /// グループを設定
    pub fn with_group(mut self, group_id: u64) -> Self {
        self.group_id = Some(group_id);
        self
    }

    /// 同じ(user, course)の組を指しているか
    pub fn is_same_pair(&self, user_id: u64, course_id: u64) -> bool {
        self.user_id == user_id && self.course_id == course_id
    }

    /// グループに所属しているか
    pub fn has_group(&self) -> bool {
        self.group_id.is_some()
    }
}
