//! Credentials - 服务商范围的一对密钥字段
//!
//! - provider A: access key id + secret access key
//! - provider B: subscription key + endpoint
//!
//! Debug 输出总是脱敏，drop 时清零内存

use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    primary: String,
    secondary: String,
}

impl Credentials {
    /// 创建凭据，两个字段都会去掉首尾空白
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        let primary: String = primary.into();
        let secondary: String = secondary.into();
        Self {
            primary: primary.trim().to_string(),
            secondary: secondary.trim().to_string(),
        }
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn secondary(&self) -> &str {
        &self.secondary
    }

    /// 两个字段都非空
    pub fn is_complete(&self) -> bool {
        !self.primary.is_empty() && !self.secondary.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("primary", &"***")
            .field("secondary", &"***")
            .finish()
    }
}
