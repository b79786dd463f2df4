//! Pure mapping from instance snapshots to what the dashboard shows.

use crate::models::Instance;

pub const NO_INSTANCES: &str = "No instances found";

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceView {
    pub rows: Vec<InstanceRow>,
    /// Shown instead of rows when the list is empty.
    pub placeholder: Option<&'static str>,
    pub cards: Vec<InstanceCard>,
}

impl InstanceView {
    pub fn visible_card(&self) -> Option<&InstanceCard> {
        self.cards.iter().find(|card| card.visible)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRow {
    pub id: String,
    pub name: String,
    pub token: String,
    pub connected: bool,
    pub logged_in: bool,
}

impl InstanceRow {
    pub fn connected_label(&self) -> &'static str {
        yes_no(self.connected)
    }

    pub fn logged_in_label(&self) -> &'static str {
        yes_no(self.logged_in)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QrPanel {
    /// Logged in, nothing to scan.
    Hidden,
    /// Not logged in and no code issued yet.
    Waiting,
    /// Data URL of the code to scan.
    Image(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    Connect,
    Logout,
    PairWithCode,
    SetWebhook,
}

impl CardAction {
    pub fn label(&self) -> &'static str {
        match self {
            CardAction::Connect => "Connect",
            CardAction::Logout => "Logout",
            CardAction::PairWithCode => "Login with Pairing Code",
            CardAction::SetWebhook => "Set Webhook",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceCard {
    pub id: String,
    pub name: String,
    pub token: String,
    pub connection_label: &'static str,
    pub login_label: &'static str,
    pub connected: bool,
    pub logged_in: bool,
    pub jid: String,
    pub webhook: String,
    pub events: String,
    pub qr: QrPanel,
    pub actions: Vec<CardAction>,
    pub visible: bool,
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

pub fn render_instances(instances: &[Instance], current_instance: Option<&str>) -> InstanceView {
    let rows = instances
        .iter()
        .map(|instance| InstanceRow {
            id: instance.id.clone(),
            name: instance.name.clone(),
            token: instance.token.clone(),
            connected: instance.connected,
            logged_in: instance.logged_in,
        })
        .collect::<Vec<_>>();

    let cards = instances
        .iter()
        .map(|instance| render_card(instance, current_instance))
        .collect();

    InstanceView {
        placeholder: rows.is_empty().then_some(NO_INSTANCES),
        rows,
        cards,
    }
}

fn render_card(instance: &Instance, current_instance: Option<&str>) -> InstanceCard {
    let qr = if instance.logged_in {
        QrPanel::Hidden
    } else {
        match non_empty(&instance.qrcode) {
            Some(code) => QrPanel::Image(code.to_string()),
            None => QrPanel::Waiting,
        }
    };

    let mut actions = Vec::with_capacity(3);
    if instance.connected {
        actions.push(CardAction::Logout);
        if !instance.logged_in {
            actions.push(CardAction::PairWithCode);
        }
    } else {
        actions.push(CardAction::Connect);
    }
    actions.push(CardAction::SetWebhook);

    InstanceCard {
        id: instance.id.clone(),
        name: instance.name.clone(),
        token: instance.token.clone(),
        connection_label: if instance.connected { "Connected" } else { "Disconnected" },
        login_label: if instance.logged_in { "Logged In" } else { "Logged Out" },
        connected: instance.connected,
        logged_in: instance.logged_in,
        jid: non_empty(&instance.jid).unwrap_or("Not available").to_string(),
        webhook: non_empty(&instance.webhook).unwrap_or("Not configured").to_string(),
        events: non_empty(&instance.events).unwrap_or("All").to_string(),
        qr,
        actions,
        visible: current_instance == Some(instance.id.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(id: &str, connected: bool, logged_in: bool) -> Instance {
        Instance {
            id: id.to_string(),
            name: format!("inst-{}", id),
            token: format!("tok-{}", id),
            connected,
            logged_in,
            jid: None,
            webhook: None,
            events: None,
            qrcode: None,
        }
    }

    #[test]
    fn test_empty_list_shows_placeholder() {
        let view = render_instances(&[], None);
        assert!(view.rows.is_empty());
        assert!(view.cards.is_empty());
        assert_eq!(view.placeholder, Some(NO_INSTANCES));
    }

    #[test]
    fn test_rows_and_defaults() {
        let view = render_instances(&[instance("1", true, true)], None);
        assert_eq!(view.placeholder, None);
        assert_eq!(view.rows[0].connected_label(), "Yes");
        let card = &view.cards[0];
        assert_eq!(card.jid, "Not available");
        assert_eq!(card.webhook, "Not configured");
        assert_eq!(card.events, "All");
        assert_eq!(card.qr, QrPanel::Hidden);
        assert!(!card.visible);
    }

    #[test]
    fn test_only_current_card_visible() {
        let list = [instance("1", false, false), instance("2", false, false)];
        let view = render_instances(&list, Some("2"));
        assert!(!view.cards[0].visible);
        assert!(view.cards[1].visible);
        assert_eq!(view.visible_card().map(|c| c.id.as_str()), Some("2"));
    }

    #[test]
    fn test_actions_follow_connection_state() {
        let offline = render_card(&instance("1", false, false), None);
        assert_eq!(offline.actions, vec![CardAction::Connect, CardAction::SetWebhook]);
        assert_eq!(offline.qr, QrPanel::Waiting);

        let pairing = render_card(&instance("1", true, false), None);
        assert_eq!(
            pairing.actions,
            vec![CardAction::Logout, CardAction::PairWithCode, CardAction::SetWebhook]
        );

        let online = render_card(&instance("1", true, true), None);
        assert_eq!(online.actions, vec![CardAction::Logout, CardAction::SetWebhook]);
        assert_eq!(online.login_label, "Logged In");
    }

    #[test]
    fn test_qr_image_when_not_logged_in() {
        let mut pending = instance("9", true, false);
        pending.qrcode = Some("data:image/png;base64,AAAA".to_string());
        let card = render_card(&pending, Some("9"));
        assert_eq!(card.qr, QrPanel::Image("data:image/png;base64,AAAA".to_string()));
    }
}
