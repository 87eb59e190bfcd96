#[cfg(test)]
#[path = "widget_test.rs"]
mod tests;

use std::time::Duration;
use std::time::Instant;

use anyhow::anyhow;
use anyhow::bail;
use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time;

use super::MessageStore;
use super::NotificationDispatcher;
use super::ReconcileOutcome;
use super::SessionCache;
use super::TypingTracker;
use super::TypingTransition;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Conversation;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::NotifierName;
use crate::domain::models::OutboundEvent;
use crate::domain::models::TransportName;
use crate::domain::models::TypingSignal;
use crate::infrastructure::api::ChatApi;
use crate::infrastructure::notifiers::NotifierManager;
use crate::infrastructure::transports::TransportBox;
use crate::infrastructure::transports::TransportManager;

const START_ATTEMPTS: usize = 3;
const START_RETRY_DELAY: Duration = Duration::from_secs(1);
const TICK_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WidgetPhase {
    Closed,
    Opening,
    Ready,
    Failed,
}

/// The support-chat widget engine. Owns the message store, the typing
/// tracker, the notification dispatcher and the gateway transport, and runs
/// the bootstrap and event-processing logic between them. The host UI
/// renders `messages()` and `remote_typist()` and forwards user input.
pub struct ChatWidget {
    participant_id: String,
    phase: WidgetPhase,
    focused: bool,
    pulse: bool,
    conversation: Option<Conversation>,
    store: MessageStore,
    typing: TypingTracker,
    dispatcher: NotificationDispatcher,
    session_cache: SessionCache,
    api: ChatApi,
    transport: TransportBox,
    tx: mpsc::UnboundedSender<Event>,
}

impl ChatWidget {
    pub fn new(
        participant_id: &str,
        api: ChatApi,
        transport: TransportBox,
        dispatcher: NotificationDispatcher,
        session_cache: SessionCache,
        tx: mpsc::UnboundedSender<Event>,
    ) -> ChatWidget {
        return ChatWidget {
            participant_id: participant_id.to_string(),
            phase: WidgetPhase::Closed,
            focused: true,
            pulse: false,
            conversation: None,
            store: MessageStore::default(),
            typing: TypingTracker::default(),
            dispatcher,
            session_cache,
            api,
            transport,
            tx,
        };
    }

    /// Builds a widget from global config: websocket transport, configured
    /// notifier, default API endpoints and cache location.
    pub fn from_config(tx: mpsc::UnboundedSender<Event>) -> Result<ChatWidget> {
        let participant_id = Config::get(ConfigKey::ParticipantId);
        if participant_id.is_empty() {
            bail!("participant-id must be configured before opening the support widget");
        }

        let notifier_name = NotifierName::parse(&Config::get(ConfigKey::Notifier))
            .unwrap_or(NotifierName::None);

        return Ok(ChatWidget::new(
            &participant_id,
            ChatApi::default(),
            TransportManager::get(TransportName::WebSocket)?,
            NotificationDispatcher::new(NotifierManager::get(notifier_name)?),
            SessionCache::default(),
            tx,
        ));
    }

    pub fn phase(&self) -> WidgetPhase {
        return self.phase;
    }

    pub fn messages(&self) -> &[Message] {
        return self.store.messages();
    }

    pub fn conversation_id(&self) -> Option<&str> {
        return self.conversation.as_ref().map(|c| return c.id.as_str());
    }

    pub fn remote_typist(&self) -> Option<&str> {
        return self.typing.active_remote_typist();
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    /// Reads and clears the visual-pulse flag raised when the audible cue
    /// could not be played.
    pub fn take_pulse(&mut self) -> bool {
        let pulse = self.pulse;
        self.pulse = false;
        return pulse;
    }

    /// Bootstraps the conversation: resume the cached id when one exists,
    /// otherwise start a fresh conversation (bounded retries), then open the
    /// gateway channel. Joining and hydration happen when the transport
    /// reports `ChannelConnected`, which guarantees handlers are registered
    /// before any push event can arrive.
    pub async fn open(&mut self) -> Result<()> {
        self.phase = WidgetPhase::Opening;

        let conversation_id = match self.session_cache.load(&self.participant_id).await? {
            Some(id) => id,
            None => match self.start_conversation().await {
                Ok(id) => id,
                Err(err) => {
                    self.phase = WidgetPhase::Failed;
                    tracing::error!(err = ?err, "Could not start a support conversation");
                    return Err(err);
                }
            },
        };

        self.conversation = Some(Conversation {
            id: conversation_id,
            participant_id: self.participant_id.clone(),
        });

        let tx = self.tx.clone();
        if let Err(err) = self.transport.connect(&tx).await {
            self.phase = WidgetPhase::Failed;
            return Err(err);
        }

        return Ok(());
    }

    /// Renders the message immediately and fires the send request in the
    /// background; a failure comes back as `SendFailed` and flags the entry
    /// for retry. Returns the optimistic entry's temp id.
    pub async fn send(&mut self, content: &str) -> Result<String> {
        let conversation_id = match self.conversation.as_ref() {
            Some(conversation) => conversation.id.clone(),
            None => bail!("No active conversation, the widget is still bootstrapping"),
        };

        if self.phase == WidgetPhase::Failed {
            bail!("The support channel is unavailable, retry opening the widget first");
        }

        let temp_id = self.store.append_optimistic(content);

        if self.typing.message_sent() == Some(TypingTransition::Stopped) {
            self.emit_typing(false).await?;
        }

        self.dispatch_send(&conversation_id, content, &temp_id);
        return Ok(temp_id);
    }

    /// Re-sends a previously failed optimistic entry under its original
    /// temp id, so the eventual echo still correlates.
    pub async fn retry(&mut self, temp_id: &str) -> Result<()> {
        let conversation_id = match self.conversation.as_ref() {
            Some(conversation) => conversation.id.clone(),
            None => bail!("No active conversation, the widget is still bootstrapping"),
        };

        let content = match self.store.clear_failed(temp_id) {
            Some(content) => content,
            None => bail!(format!("No failed message with temp id {temp_id}")),
        };

        self.dispatch_send(&conversation_id, &content, temp_id);
        return Ok(());
    }

    /// Forwarded by the host on every input keystroke; only the first one
    /// after idle emits a typing signal.
    pub async fn keystroke(&mut self) -> Result<()> {
        if self.typing.keystroke(Instant::now()) == Some(TypingTransition::Started) {
            self.emit_typing(true).await?;
        }

        return Ok(());
    }

    pub async fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::ChannelConnected() | Event::ChannelReconnected() => {
                self.join_and_hydrate().await?;
            }
            Event::ChannelDown(reason) => {
                tracing::warn!(reason, "Support channel dropped, reconnecting");
                let tx = self.tx.clone();
                if let Err(err) = self.transport.connect(&tx).await {
                    self.phase = WidgetPhase::Failed;
                    tracing::error!(err = ?err, "Reconnect exhausted all attempts");
                }
            }
            Event::ChannelError(reason) => {
                self.phase = WidgetPhase::Failed;
                tracing::error!(reason, "Support channel failed terminally");
            }
            Event::ConversationStarted(id) => {
                // Server-initiated conversation; adopt it only when nothing
                // is active yet.
                if self.conversation.is_none() {
                    self.session_cache.save(&self.participant_id, &id).await?;
                    self.conversation = Some(Conversation {
                        id,
                        participant_id: self.participant_id.clone(),
                    });
                    self.join_and_hydrate().await?;
                }
            }
            Event::MessageReceived(descriptor) => {
                let message = descriptor.resolve(&self.participant_id);
                if self.store.reconcile(message.clone()) == ReconcileOutcome::Appended
                    && !self.focused
                {
                    let tx = self.tx.clone();
                    self.dispatcher.dispatch(&message, &tx).await?;
                }
            }
            Event::RemoteTyping(signal) => {
                if self.is_active_conversation(&signal.conversation_id)
                    && signal.sender != self.participant_id
                {
                    self.typing.remote_typing(&signal.sender, Instant::now());
                }
            }
            Event::RemoteStoppedTyping(signal) => {
                if self.is_active_conversation(&signal.conversation_id) {
                    self.typing.remote_stopped(&signal.sender);
                }
            }
            Event::SendFailed(temp_id) => {
                self.store.mark_failed(&temp_id);
            }
            Event::NotificationPulse() => {
                self.pulse = true;
            }
            Event::Tick() => {
                self.tick(Instant::now()).await?;
            }
        }

        return Ok(());
    }

    pub async fn tick(&mut self, now: Instant) -> Result<()> {
        if self.typing.local_tick(now) == Some(TypingTransition::Stopped) {
            self.emit_typing(false).await?;
        }

        self.typing.remote_tick(now);
        return Ok(());
    }

    /// Convenience loop for hosts that do not drive events themselves.
    /// Returns when the event channel closes or the widget is closed.
    pub async fn run(&mut self, rx: &mut mpsc::UnboundedReceiver<Event>) -> Result<()> {
        loop {
            let event = tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => return Ok(()),
                },
                _ = time::sleep(TICK_INTERVAL) => Event::Tick(),
            };

            self.handle_event(event).await?;

            if self.phase == WidgetPhase::Closed {
                return Ok(());
            }
        }
    }

    /// Leaves the conversation and stops the transport so no orphaned
    /// handler can mutate a store that is no longer displayed.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(conversation) = self.conversation.as_ref() {
            let conversation_id = conversation.id.clone();
            if let Err(err) = self.transport.leave_conversation(&conversation_id).await {
                tracing::warn!(err = ?err, "Leaving the conversation failed during close");
            }
        }

        self.transport.close().await?;
        self.typing.reset();
        self.phase = WidgetPhase::Closed;
        return Ok(());
    }

    async fn start_conversation(&mut self) -> Result<String> {
        let mut last_err = anyhow!("Start conversation was never attempted");

        for attempt in 1..=START_ATTEMPTS {
            match self.api.start_conversation(&self.participant_id).await {
                Ok(id) => {
                    self.session_cache.save(&self.participant_id, &id).await?;
                    return Ok(id);
                }
                Err(err) => {
                    tracing::warn!(attempt, err = ?err, "Start-conversation attempt failed");
                    last_err = err;
                }
            }

            if attempt < START_ATTEMPTS {
                time::sleep(START_RETRY_DELAY).await;
            }
        }

        return Err(last_err);
    }

    /// Join must be re-issued on every connect, and history re-fetched,
    /// because the gateway neither preserves join state nor replays events
    /// missed while disconnected. Push events arriving during the fetch sit
    /// in the event channel and reconcile after hydration.
    async fn join_and_hydrate(&mut self) -> Result<()> {
        for rebootstrapped in [false, true] {
            let conversation_id = match self.conversation.as_ref() {
                Some(conversation) => conversation.id.clone(),
                None => return Ok(()),
            };

            self.transport.join_conversation(&conversation_id).await?;

            if let Some(history) = self.api.history(&conversation_id).await? {
                let messages = history
                    .iter()
                    .map(|e| return e.resolve(&self.participant_id))
                    .collect::<Vec<Message>>();

                self.store.hydrate(messages);
                self.phase = WidgetPhase::Ready;
                return Ok(());
            }

            if rebootstrapped {
                break;
            }

            // The backend no longer knows the cached conversation; drop it
            // and bootstrap a fresh one.
            tracing::warn!(conversation_id, "Cached conversation rejected by the backend");
            self.session_cache.delete(&self.participant_id).await?;
            let id = self.start_conversation().await?;
            self.conversation = Some(Conversation {
                id,
                participant_id: self.participant_id.clone(),
            });
        }

        self.phase = WidgetPhase::Failed;
        bail!("The backend rejected the conversation during bootstrap");
    }

    async fn emit_typing(&mut self, started: bool) -> Result<()> {
        let conversation_id = match self.conversation.as_ref() {
            Some(conversation) => conversation.id.clone(),
            None => return Ok(()),
        };

        let signal = TypingSignal {
            conversation_id,
            sender: self.participant_id.clone(),
        };

        let event = if started {
            OutboundEvent::Typing(signal)
        } else {
            OutboundEvent::StopTyping(signal)
        };

        return self.transport.emit(event).await;
    }

    fn dispatch_send(&self, conversation_id: &str, content: &str, temp_id: &str) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        let sender_id = self.participant_id.clone();
        let conversation_id = conversation_id.to_string();
        let content = content.to_string();
        let temp_id = temp_id.to_string();

        tokio::spawn(async move {
            let res = api
                .send_message(&conversation_id, &content, &sender_id, &temp_id)
                .await;

            if let Err(err) = res {
                tracing::warn!(err = ?err, temp_id, "Send request failed, marking for retry");
                tx.send(Event::SendFailed(temp_id))?;
            }

            return Ok::<(), anyhow::Error>(());
        });
    }

    fn is_active_conversation(&self, conversation_id: &str) -> bool {
        return self.conversation_id() == Some(conversation_id);
    }
}
