use super::InMsg;
use typed_builder::TypedBuilder;
use zwave_core::prelude::*;

/// Describes the reply a synchronous send is waiting for
#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct ReplyMatch {
    pub function_type: FunctionType,
    #[builder(default, setter(strip_option))]
    pub source: Option<NodeId>,
    #[builder(default, setter(strip_option))]
    pub class_id: Option<u8>,
    #[builder(default, setter(strip_option))]
    pub cmd_id: Option<u8>,
}

impl ReplyMatch {
    /// Expects the given command from the given node
    pub fn cc_reply(source: NodeId, class: CommandClasses, cmd_id: u8) -> Self {
        Self {
            function_type: FunctionType::ApplicationCommand,
            source: Some(source),
            class_id: Some(class as u8),
            cmd_id: Some(cmd_id),
        }
    }

    pub fn matches(&self, msg: &InMsg) -> bool {
        if msg.function_type() != Some(self.function_type) {
            return false;
        }
        if self.source.is_some() && msg.source_node() != self.source {
            return false;
        }
        if self.class_id.is_none() && self.cmd_id.is_none() {
            return true;
        }
        let Ok(cc) = msg.cc_span() else {
            return false;
        };
        let class_ok = self.class_id.is_none_or(|class| cc.first() == Some(&class));
        let cmd_ok = self.cmd_id.is_none_or(|cmd| cc.get(1) == Some(&cmd));
        class_ok && cmd_ok
    }
}
