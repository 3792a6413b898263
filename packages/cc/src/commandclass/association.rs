use crate::prelude::*;
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::TryFromPrimitive;
use typed_builder::TypedBuilder;
use zwave_core::parse::bytes::{be_u8, rest};
use zwave_core::prelude::*;
use zwave_core::serialize;

#[derive(Debug, Clone, Copy, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum AssociationCCCommand {
    Set = 0x01,
    Get = 0x02,
    Report = 0x03,
    Remove = 0x04,
}

fn parse_node_ids(i: &mut Bytes) -> ParseResult<Vec<NodeId>> {
    Ok(rest(i)?.iter().copied().map(NodeId::new).collect())
}

fn serialize_node_ids(node_ids: &[NodeId], output: &mut BytesMut) {
    for node_id in node_ids {
        node_id.serialize(output);
    }
}

fn node_ids_to_string(node_ids: &[NodeId]) -> String {
    node_ids
        .iter()
        .map(|n| n.raw().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct AssociationCCSet {
    pub group_id: u8,
    pub node_ids: Vec<NodeId>,
}

impl CCBase for AssociationCCSet {}

impl CCId for AssociationCCSet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Association
    }

    fn cc_command(&self) -> Option<u8> {
        Some(AssociationCCCommand::Set as _)
    }
}

impl CCParsable for AssociationCCSet {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let group_id = be_u8(i)?;
        let node_ids = parse_node_ids(i)?;
        Ok(Self { group_id, node_ids })
    }
}

impl CCSerializable for AssociationCCSet {
    fn serialize(&self, output: &mut BytesMut) {
        serialize::bytes::be_u8(self.group_id).serialize(output);
        serialize_node_ids(&self.node_ids, output);
    }
}

impl ToLogPayload for AssociationCCSet {
    fn to_log_payload(&self) -> LogPayload {
        LogPayloadDict::new()
            .with_entry("group id", self.group_id.to_string())
            .with_entry("node ids", node_ids_to_string(&self.node_ids))
            .into()
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct AssociationCCGet {
    pub group_id: u8,
}

impl CCBase for AssociationCCGet {
    fn expects_response(&self) -> bool {
        true
    }

    fn test_response(&self, response: &CC) -> bool {
        matches!(response, CC::AssociationCCReport(report) if report.group_id == self.group_id)
    }
}

impl CCId for AssociationCCGet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Association
    }

    fn cc_command(&self) -> Option<u8> {
        Some(AssociationCCCommand::Get as _)
    }
}

impl CCParsable for AssociationCCGet {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let group_id = be_u8(i)?;
        Ok(Self { group_id })
    }
}

impl CCSerializable for AssociationCCGet {
    fn serialize(&self, output: &mut BytesMut) {
        serialize::bytes::be_u8(self.group_id).serialize(output)
    }
}

impl ToLogPayload for AssociationCCGet {
    fn to_log_payload(&self) -> LogPayload {
        LogPayloadDict::new()
            .with_entry("group id", self.group_id.to_string())
            .into()
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct AssociationCCReport {
    pub group_id: u8,
    pub max_nodes: u8,
    #[builder(default)]
    pub reports_to_follow: u8,
    pub node_ids: Vec<NodeId>,
}

impl CCBase for AssociationCCReport {}

impl CCId for AssociationCCReport {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Association
    }

    fn cc_command(&self) -> Option<u8> {
        Some(AssociationCCCommand::Report as _)
    }
}

impl CCParsable for AssociationCCReport {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let (group_id, max_nodes, reports_to_follow) = (be_u8, be_u8, be_u8).parse(i)?;
        let node_ids = parse_node_ids(i)?;
        Ok(Self {
            group_id,
            max_nodes,
            reports_to_follow,
            node_ids,
        })
    }
}

impl CCSerializable for AssociationCCReport {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::{bytes::be_u8, sequence::tuple};
        tuple((
            be_u8(self.group_id),
            be_u8(self.max_nodes),
            be_u8(self.reports_to_follow),
        ))
        .serialize(output);
        serialize_node_ids(&self.node_ids, output);
    }
}

impl ToLogPayload for AssociationCCReport {
    fn to_log_payload(&self) -> LogPayload {
        LogPayloadDict::new()
            .with_entry("group id", self.group_id.to_string())
            .with_entry("max nodes", self.max_nodes.to_string())
            .with_entry("node ids", node_ids_to_string(&self.node_ids))
            .with_entry("reports to follow", self.reports_to_follow.to_string())
            .into()
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct AssociationCCRemove {
    /// Group 0 removes the nodes from all groups
    #[builder(default)]
    pub group_id: u8,
    #[builder(default)]
    pub node_ids: Vec<NodeId>,
}

impl CCBase for AssociationCCRemove {}

impl CCId for AssociationCCRemove {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Association
    }

    fn cc_command(&self) -> Option<u8> {
        Some(AssociationCCCommand::Remove as _)
    }
}

impl CCParsable for AssociationCCRemove {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let group_id = be_u8(i)?;
        let node_ids = parse_node_ids(i)?;
        Ok(Self { group_id, node_ids })
    }
}

impl CCSerializable for AssociationCCRemove {
    fn serialize(&self, output: &mut BytesMut) {
        serialize::bytes::be_u8(self.group_id).serialize(output);
        serialize_node_ids(&self.node_ids, output);
    }
}

impl ToLogPayload for AssociationCCRemove {
    fn to_log_payload(&self) -> LogPayload {
        LogPayloadDict::new()
            .with_entry("group id", self.group_id.to_string())
            .with_entry("node ids", node_ids_to_string(&self.node_ids))
            .into()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use zwave_core::hex_bytes;

    #[test]
    fn test_set() {
        let cc = AssociationCCSet::builder()
            .group_id(1)
            .node_ids(vec![NodeId::new(1)])
            .build();
        assert_eq!(
            CC::from(cc).as_raw(),
            CCRaw::try_from_bytes(hex_bytes!("85010101")).unwrap()
        );
    }

    #[test]
    fn test_report() {
        let raw = CCRaw::try_from_bytes(hex_bytes!("8503020500010f")).unwrap();
        let CC::AssociationCCReport(report) = CC::try_from_raw(raw).unwrap() else {
            panic!("expected a report");
        };
        assert_eq!(report.group_id, 2);
        assert_eq!(report.max_nodes, 5);
        assert_eq!(report.node_ids, vec![NodeId::new(1), NodeId::new(15)]);
    }
}
