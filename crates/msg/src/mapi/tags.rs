//! Static property-name dictionaries: built-in tag names keyed by the
//! 4-hex-digit tag, and named-property names keyed by (namespace GUID,
//! identifier). Loaded once, read-only for the process lifetime.

use std::{collections::BTreeMap, sync::OnceLock};

use super::value::GuidValue;

/// `PSETID_Common`
pub const PSETID_COMMON: GuidValue = GuidValue::new(
    0x00062008,
    0x0000,
    0x0000,
    [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
);

/// `PSETID_Appointment`
pub const PSETID_APPOINTMENT: GuidValue = GuidValue::new(
    0x00062002,
    0x0000,
    0x0000,
    [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
);

/// `PSETID_Task`
pub const PSETID_TASK: GuidValue = GuidValue::new(
    0x00062003,
    0x0000,
    0x0000,
    [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
);

/// `PSETID_Address`
pub const PSETID_ADDRESS: GuidValue = GuidValue::new(
    0x00062004,
    0x0000,
    0x0000,
    [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
);

/// Built-in numeric tags. Far from exhaustive; a miss falls back to the
/// raw hex display form.
const TAG_NAMES: &[(u16, &str)] = &[
    (0x0002, "alternate_recipient_allowed"),
    (0x0017, "importance"),
    (0x001A, "message_class"),
    (0x0023, "originator_delivery_report_requested"),
    (0x0026, "priority"),
    (0x0029, "read_receipt_requested"),
    (0x002B, "recipient_reassignment_prohibited"),
    (0x002E, "original_sensitivity"),
    (0x0036, "sensitivity"),
    (0x0037, "subject"),
    (0x0039, "client_submit_time"),
    (0x003D, "subject_prefix"),
    (0x0040, "received_by_name"),
    (0x0041, "sent_representing_entryid"),
    (0x0042, "sent_representing_name"),
    (0x0043, "received_representing_entryid"),
    (0x0044, "received_representing_name"),
    (0x0057, "message_to_me"),
    (0x0058, "message_cc_me"),
    (0x0059, "message_recip_me"),
    (0x0064, "sent_representing_address_type"),
    (0x0065, "sent_representing_email_address"),
    (0x0070, "conversation_topic"),
    (0x0071, "conversation_index"),
    (0x0075, "received_by_address_type"),
    (0x0076, "received_by_email_address"),
    (0x0077, "received_representing_address_type"),
    (0x0078, "received_representing_email_address"),
    (0x007D, "transport_message_headers"),
    (0x0C15, "recipient_type"),
    (0x0C17, "reply_requested"),
    (0x0C19, "sender_entryid"),
    (0x0C1A, "sender_name"),
    (0x0C1D, "sender_search_key"),
    (0x0C1E, "sender_address_type"),
    (0x0C1F, "sender_email_address"),
    (0x0E02, "display_bcc"),
    (0x0E03, "display_cc"),
    (0x0E04, "display_to"),
    (0x0E06, "message_delivery_time"),
    (0x0E07, "message_flags"),
    (0x0E08, "message_size"),
    (0x0E0F, "responsibility"),
    (0x0E1B, "has_attachments"),
    (0x0E1D, "normalized_subject"),
    (0x0E1F, "rtf_in_sync"),
    (0x0FF9, "record_key"),
    (0x0FFE, "object_type"),
    (0x0FFF, "entryid"),
    (0x1000, "body"),
    (0x1009, "rtf_compressed"),
    (0x1013, "body_html"),
    (0x1035, "internet_message_id"),
    (0x1039, "internet_references"),
    (0x1042, "in_reply_to_id"),
    (0x3001, "display_name"),
    (0x3002, "address_type"),
    (0x3003, "email_address"),
    (0x3007, "creation_time"),
    (0x3008, "last_modification_time"),
    (0x300B, "search_key"),
    (0x3701, "attach_data_obj"),
    (0x3702, "attach_encoding"),
    (0x3703, "attach_extension"),
    (0x3704, "attach_filename"),
    (0x3705, "attach_method"),
    (0x3707, "attach_long_filename"),
    (0x3708, "attach_pathname"),
    (0x370B, "rendering_position"),
    (0x370E, "attach_mime_tag"),
    (0x3712, "attach_content_id"),
    (0x3714, "attach_flags"),
    (0x39FE, "smtp_address"),
    (0x3A00, "account"),
    (0x3A05, "generation"),
    (0x3A06, "given_name"),
    (0x3A08, "business_telephone_number"),
    (0x3A09, "home_telephone_number"),
    (0x3A11, "surname"),
    (0x3A15, "postal_address"),
    (0x3A16, "company_name"),
    (0x3A17, "title"),
    (0x3A18, "department_name"),
    (0x3A19, "office_location"),
    (0x3A1C, "mobile_telephone_number"),
    (0x5D01, "sender_smtp_address"),
    (0x5D02, "sent_representing_smtp_address"),
];

/// Named properties with integer sub-identifiers, keyed by (namespace,
/// identifier).
const NAMED_NUMBER_NAMES: &[(GuidValue, u32, &str)] = &[
    (PSETID_COMMON, 0x8503, "reminder_set"),
    (PSETID_COMMON, 0x8506, "private"),
    (PSETID_COMMON, 0x8510, "side_effects"),
    (PSETID_COMMON, 0x8514, "smart_no_attach"),
    (PSETID_COMMON, 0x8530, "flag_request"),
    (PSETID_COMMON, 0x8580, "internet_account_name"),
    (PSETID_APPOINTMENT, 0x8208, "location"),
    (PSETID_APPOINTMENT, 0x820D, "appointment_start_whole"),
    (PSETID_APPOINTMENT, 0x820E, "appointment_end_whole"),
    (PSETID_APPOINTMENT, 0x8215, "all_day_event"),
    (PSETID_APPOINTMENT, 0x8223, "recurring"),
    (PSETID_TASK, 0x8101, "task_status"),
    (PSETID_TASK, 0x8104, "task_start_date"),
    (PSETID_TASK, 0x8105, "task_due_date"),
    (PSETID_TASK, 0x811C, "task_complete"),
    (PSETID_ADDRESS, 0x8005, "file_under"),
    (PSETID_ADDRESS, 0x8082, "email1_address_type"),
    (PSETID_ADDRESS, 0x8083, "email1_email_address"),
];

/// Named properties with string sub-identifiers.
const NAMED_STRING_NAMES: &[(GuidValue, &str, &str)] = &[(
    super::key::PS_PUBLIC_STRINGS,
    "Keywords",
    "categories",
)];

fn tag_map() -> &'static BTreeMap<u16, &'static str> {
    static MAP: OnceLock<BTreeMap<u16, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| TAG_NAMES.iter().copied().collect())
}

pub(crate) fn tag_name(tag: u16) -> Option<&'static str> {
    tag_map().get(&tag).copied()
}

pub(crate) fn named_number_name(guid: &GuidValue, id: u32) -> Option<&'static str> {
    NAMED_NUMBER_NAMES
        .iter()
        .find(|(entry_guid, entry_id, _)| entry_guid == guid && *entry_id == id)
        .map(|(_, _, name)| *name)
}

pub(crate) fn named_string_name(guid: &GuidValue, name: &str) -> Option<&'static str> {
    NAMED_STRING_NAMES
        .iter()
        .find(|(entry_guid, entry_name, _)| entry_guid == guid && *entry_name == name)
        .map(|(_, _, canonical)| *canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_lookup() {
        assert_eq!(tag_name(0x0037), Some("subject"));
        assert_eq!(tag_name(0x1009), Some("rtf_compressed"));
        assert_eq!(tag_name(0x6FFF), None);
    }

    #[test]
    fn test_named_number_lookup() {
        assert_eq!(
            named_number_name(&PSETID_APPOINTMENT, 0x8208),
            Some("location")
        );
        assert_eq!(named_number_name(&PSETID_COMMON, 0x8208), None);
    }
}
