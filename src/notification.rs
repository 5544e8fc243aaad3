//! Transient, dismissable notices for recoverable failures.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub expires_at: u64,
}

#[derive(Debug, Clone)]
pub struct NoticeBoard {
    notices: Vec<Notice>,
    next_id: u64,
    ttl_ms: u64,
}

impl NoticeBoard {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            notices: Vec::new(),
            next_id: 1,
            ttl_ms,
        }
    }

    pub fn push(&mut self, level: NoticeLevel, body: impl Into<String>, now_ms: u64) -> Notice {
        let notice = Notice {
            id: self.next_id,
            level,
            message: body.into(),
            expires_at: now_ms.saturating_add(self.ttl_ms),
        };
        self.next_id += 1;
        self.notices.push(notice.clone());
        notice
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.notices.len();
        self.notices.retain(|notice| notice.id != id);
        before != self.notices.len()
    }

    pub fn expire(&mut self, now_ms: u64) -> usize {
        let before = self.notices.len();
        self.notices.retain(|notice| notice.expires_at > now_ms);
        before - self.notices.len()
    }

    pub fn active(&self) -> &[Notice] {
        &self.notices
    }
}
