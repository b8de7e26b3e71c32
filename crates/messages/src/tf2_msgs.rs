use serde::{Deserialize, Serialize};

use contracts::MessageSchema;

use crate::cdr::RosMessage;
use crate::geometry_msgs::TransformStamped;
use crate::schema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TFMessage {
    pub transforms: Vec<TransformStamped>,
}

impl RosMessage for TFMessage {
    const SCHEMA: &'static MessageSchema = &schema::TF_MESSAGE;
}
