//! Discord gateway glue: slash commands and ticket buttons.
//!
//! Every guild gets its own [`Assistant`], created on first use. The handler
//! only parses interactions, checks permissions and renders results; state
//! lives in the assistant.

use crate::config::Config;
use crate::platform::discord::{CLOSE_TICKET_BUTTON, CREATE_TICKET_BUTTON, DiscordPlatform};
use crate::tickets::TicketCreation;
use crate::{Assistant, ContainerRef, Error, SubjectId};

use serenity::all::{
    ButtonStyle, ChannelId, Colour, CommandDataOption, CommandInteraction, CommandOptionType,
    ComponentInteraction, Context, CreateActionRow, CreateButton, CreateCommand,
    CreateCommandOption, CreateEmbed, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, EventHandler, GuildId,
    Interaction, Member, Permissions, Ready, UserId,
};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DISCONNECT_COMMAND: &str = "disconnect";
const CANCEL_COMMAND: &str = "cancel";
const SETUP_TICKETS_COMMAND: &str = "setup_tickets";

/// Gateway event handler.
pub struct Handler {
    config: Arc<Config>,
    assistants: Mutex<HashMap<GuildId, Arc<Assistant<DiscordPlatform>>>>,
}

impl Handler {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            assistants: Mutex::new(HashMap::new()),
        }
    }

    /// Cancel pending disconnects in every guild.
    pub fn shutdown(&self) {
        let assistants: Vec<_> = self
            .assistants
            .lock()
            .expect("assistants lock poisoned")
            .values()
            .cloned()
            .collect();
        for assistant in assistants {
            assistant.shutdown();
        }
    }

    fn assistant(&self, ctx: &Context, guild_id: GuildId) -> Arc<Assistant<DiscordPlatform>> {
        let mut assistants = self.assistants.lock().expect("assistants lock poisoned");
        assistants
            .entry(guild_id)
            .or_insert_with(|| {
                let platform = DiscordPlatform::new(
                    ctx.http.clone(),
                    ctx.cache.clone(),
                    guild_id,
                    &self.config.tickets,
                );
                tracing::debug!(%guild_id, "assistant created");
                Arc::new(Assistant::new(Arc::new(platform), &self.config))
            })
            .clone()
    }

    async fn handle_command(&self, ctx: &Context, command: &CommandInteraction) {
        let Some(guild_id) = command.guild_id else {
            respond(ctx, command, "This command only works in a server.").await;
            return;
        };
        let assistant = self.assistant(ctx, guild_id);

        tracing::info!(
            command = %command.data.name,
            user = %command.user.id,
            %guild_id,
            "slash command received"
        );

        match command.data.name.as_str() {
            DISCONNECT_COMMAND => handle_disconnect(ctx, command, &assistant).await,
            CANCEL_COMMAND => handle_cancel(ctx, command, &assistant).await,
            SETUP_TICKETS_COMMAND => self.handle_setup_tickets(ctx, command).await,
            other => tracing::warn!(command = other, "unknown command"),
        }
    }

    async fn handle_setup_tickets(&self, ctx: &Context, command: &CommandInteraction) {
        if !is_admin(command.member.as_deref()) {
            respond(ctx, command, "Only administrators can post the ticket panel.").await;
            return;
        }

        let tickets = &self.config.tickets;
        let embed = CreateEmbed::new()
            .title(&tickets.panel_title)
            .description("Click the button below to open a private ticket with our support team.")
            .colour(Colour::BLUE);
        let button = CreateButton::new(CREATE_TICKET_BUTTON)
            .label(format!("Open a {} Ticket", tickets.service_name))
            .style(ButtonStyle::Success)
            .emoji('🎟');
        let message = CreateInteractionResponseMessage::new()
            .embed(embed)
            .components(vec![CreateActionRow::Buttons(vec![button])]);

        if let Err(error) = command
            .create_response(&ctx.http, CreateInteractionResponse::Message(message))
            .await
        {
            tracing::error!(%error, "failed to post ticket panel");
        }
    }

    async fn handle_component(&self, ctx: &Context, component: &ComponentInteraction) {
        let Some(guild_id) = component.guild_id else {
            return;
        };
        let assistant = self.assistant(ctx, guild_id);

        match component.data.custom_id.as_str() {
            CREATE_TICKET_BUTTON => handle_create_ticket(ctx, component, &assistant).await,
            CLOSE_TICKET_BUTTON => handle_close_ticket(ctx, component, &assistant).await,
            other => tracing::debug!(custom_id = other, "ignoring unknown component"),
        }
    }
}

#[serenity::async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!(user = %ready.user.name, guilds = ready.guilds.len(), "connected to discord");

        let guilds: Vec<GuildId> = match self.config.discord.guild_id {
            Some(id) => vec![GuildId::new(id)],
            None => ready.guilds.iter().map(|guild| guild.id).collect(),
        };
        for guild_id in guilds {
            match guild_id.set_commands(&ctx.http, commands()).await {
                Ok(registered) => {
                    tracing::info!(%guild_id, count = registered.len(), "slash commands registered")
                }
                Err(error) => {
                    tracing::error!(%error, %guild_id, "failed to register slash commands")
                }
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => self.handle_command(&ctx, &command).await,
            Interaction::Component(component) => self.handle_component(&ctx, &component).await,
            _ => {}
        }
    }
}

/// Slash commands registered in each guild.
pub fn commands() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(DISCONNECT_COMMAND)
            .description("Disconnect a member from voice after a delay")
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "member", "Member to disconnect")
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::Integer, "seconds", "Seconds to wait")
                    .min_int_value(0),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::Integer, "minutes", "Minutes to wait")
                    .min_int_value(0),
            ),
        CreateCommand::new(CANCEL_COMMAND)
            .description("Cancel a pending voice disconnect")
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "member", "Member to keep")
                    .required(true),
            ),
        CreateCommand::new(SETUP_TICKETS_COMMAND)
            .description("Post the support ticket panel in this channel")
            .default_member_permissions(Permissions::ADMINISTRATOR),
    ]
}

async fn handle_disconnect(
    ctx: &Context,
    command: &CommandInteraction,
    assistant: &Assistant<DiscordPlatform>,
) {
    let options = &command.data.options;
    let Some(target) = user_option(options, "member") else {
        respond(ctx, command, "Please pick a member.").await;
        return;
    };
    if !may_act_on(command.user.id, target, command.member.as_deref()) {
        respond(ctx, command, "You can only schedule disconnects for yourself.").await;
        return;
    }
    if !assistant.platform().is_in_voice(target) {
        respond(ctx, command, &format!("<@{target}> is not in a voice channel.")).await;
        return;
    }
    let Some(delay) = delay_from(
        integer_option(options, "seconds"),
        integer_option(options, "minutes"),
    ) else {
        respond(ctx, command, "Please specify a time greater than 0.").await;
        return;
    };

    let announce_in = ContainerRef(command.channel_id.get());
    let reply = match assistant.request_schedule_disconnect(subject(target), delay, Some(announce_in)) {
        Ok(replaced) => {
            let verb = if replaced { "Rescheduled" } else { "Scheduled" };
            format!(
                "⏲️ {verb}: <@{target}> will be disconnected in {}.",
                format_delay(delay)
            )
        }
        Err(error) => describe(&error),
    };
    respond(ctx, command, &reply).await;
}

async fn handle_cancel(
    ctx: &Context,
    command: &CommandInteraction,
    assistant: &Assistant<DiscordPlatform>,
) {
    let Some(target) = user_option(&command.data.options, "member") else {
        respond(ctx, command, "Please pick a member.").await;
        return;
    };
    if !may_act_on(command.user.id, target, command.member.as_deref()) {
        respond(ctx, command, "You can only cancel your own disconnects.").await;
        return;
    }

    let reply = if assistant.request_cancel_disconnect(subject(target)) {
        format!("✅ Cancelled the pending disconnect for <@{target}>.")
    } else {
        format!("There is no pending disconnect for <@{target}>.")
    };
    respond(ctx, command, &reply).await;
}

async fn handle_create_ticket(
    ctx: &Context,
    component: &ComponentInteraction,
    assistant: &Assistant<DiscordPlatform>,
) {
    if let Err(error) = component.defer_ephemeral(&ctx.http).await {
        tracing::warn!(%error, "failed to defer ticket creation");
        return;
    }

    let reply = match assistant.request_ticket_create(subject(component.user.id)).await {
        Ok(creation) => created_reply(&creation),
        Err(error) => describe(&error),
    };
    let followup = CreateInteractionResponseFollowup::new()
        .content(reply)
        .ephemeral(true);
    if let Err(error) = component.create_followup(&ctx.http, followup).await {
        tracing::warn!(%error, "failed to confirm ticket creation");
    }
}

async fn handle_close_ticket(
    ctx: &Context,
    component: &ComponentInteraction,
    assistant: &Assistant<DiscordPlatform>,
) {
    let message = CreateInteractionResponseMessage::new().content("Archiving ticket...");
    if let Err(error) = component
        .create_response(&ctx.http, CreateInteractionResponse::Message(message))
        .await
    {
        tracing::warn!(%error, "failed to acknowledge ticket close");
    }

    let container = ContainerRef(component.channel_id.get());
    if let Err(error) = assistant.request_ticket_close(container).await {
        let followup = CreateInteractionResponseFollowup::new()
            .content(describe(&error))
            .ephemeral(true);
        if let Err(error) = component.create_followup(&ctx.http, followup).await {
            tracing::warn!(%error, "failed to report ticket close failure");
        }
    }
}

async fn respond(ctx: &Context, command: &CommandInteraction, content: &str) {
    let message = CreateInteractionResponseMessage::new()
        .content(content)
        .ephemeral(true);
    if let Err(error) = command
        .create_response(&ctx.http, CreateInteractionResponse::Message(message))
        .await
    {
        tracing::warn!(%error, command = %command.data.name, "failed to respond to command");
    }
}

fn subject(user: UserId) -> SubjectId {
    SubjectId(user.get())
}

fn user_option(options: &[CommandDataOption], name: &str) -> Option<UserId> {
    options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| option.value.as_user_id())
}

fn integer_option(options: &[CommandDataOption], name: &str) -> Option<i64> {
    options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| option.value.as_i64())
}

fn is_admin(member: Option<&Member>) -> bool {
    member
        .and_then(|member| member.permissions)
        .is_some_and(|permissions| permissions.administrator())
}

fn may_act_on(invoker: UserId, target: UserId, member: Option<&Member>) -> bool {
    invoker == target || is_admin(member)
}

/// Combined delay of the `seconds` and `minutes` options, `None` unless it
/// is positive.
fn delay_from(seconds: Option<i64>, minutes: Option<i64>) -> Option<Duration> {
    let total = seconds
        .unwrap_or(0)
        .checked_add(minutes.unwrap_or(0).checked_mul(60)?)?;
    u64::try_from(total)
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

fn format_delay(delay: Duration) -> String {
    let secs = delay.as_secs();
    match (secs / 60, secs % 60) {
        (0, seconds) => format!("{seconds}s"),
        (minutes, 0) => format!("{minutes}m"),
        (minutes, seconds) => format!("{minutes}m {seconds}s"),
    }
}

fn created_reply(creation: &TicketCreation) -> String {
    let channel = ChannelId::new(creation.ticket.container.0);
    match &creation.degraded {
        None => format!("Ticket created: <#{channel}>"),
        Some(degraded) => format!(
            "Ticket created: <#{channel}> (the introduction could not be posted: {})",
            degraded.reason
        ),
    }
}

/// User-facing text for a failed request.
fn describe(error: &Error) -> String {
    match error {
        Error::ResourceUnavailable { operation, .. } => {
            tracing::warn!(%error, "request hit an unavailable resource");
            format!("❌ Discord didn't cooperate while trying to {operation}. Please try again.")
        }
        Error::NotATicket(_) => "❌ This channel is not a ticket.".into(),
        Error::AlreadyArchived(number) => format!("Ticket {number} is already archived."),
        Error::NumbersExhausted { .. } => {
            tracing::error!(%error, "ticket numbers exhausted");
            "❌ No ticket numbers are left. Please ask an administrator to clean up old tickets."
                .into()
        }
        Error::InvalidDelay(reason) => format!("❌ {reason}."),
        other => {
            tracing::error!(error = %other, "request failed");
            "❌ Something went wrong.".into()
        }
    }
}
