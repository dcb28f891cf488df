//! Discord platform using serenity.
//!
//! Groups are channel categories, containers are text channels and access
//! lists become permission overwrites. Syncing a channel's access copies the
//! category's overwrites onto it.

use super::{AccessEntry, AccessList, ContainerSummary, Notice, Permissions, Platform, Principal};
use crate::config::TicketConfig;
use crate::tickets::TicketNumber;
use crate::{ContainerRef, GroupRef, SubjectId};

use anyhow::Context as _;
use serenity::all::{
    ButtonStyle, Cache, ChannelId, ChannelType, Colour, CreateActionRow, CreateButton,
    CreateChannel, CreateEmbed, CreateMessage, EditChannel, GuildChannel, GuildId, Http,
    Mentionable as _, PermissionOverwrite, PermissionOverwriteType, RoleId, UserId,
};

use std::sync::Arc;

/// Custom ID of the persistent "open a ticket" button.
pub const CREATE_TICKET_BUTTON: &str = "ticket_create_btn";

/// Custom ID of the persistent "close & archive" button.
pub const CLOSE_TICKET_BUTTON: &str = "ticket_close_btn";

/// Serenity-backed platform for one guild.
pub struct DiscordPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
    guild_id: GuildId,
    service_name: String,
    number_width: usize,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>, guild_id: GuildId, tickets: &TicketConfig) -> Self {
        Self {
            http,
            cache,
            guild_id,
            service_name: tickets.service_name.clone(),
            number_width: tickets.number_width,
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Whether `user` currently sits in a voice channel of this guild, as
    /// seen by the gateway cache.
    pub fn is_in_voice(&self, user: UserId) -> bool {
        self.cache.guild(self.guild_id).is_some_and(|guild| {
            guild
                .voice_states
                .get(&user)
                .is_some_and(|state| state.channel_id.is_some())
        })
    }

    async fn guild_channels(&self) -> anyhow::Result<Vec<GuildChannel>> {
        let channels = self
            .guild_id
            .channels(&self.http)
            .await
            .context("failed to fetch guild channels")?;
        Ok(channels.into_values().collect())
    }

    async fn guild_channel(&self, channel: ChannelId) -> anyhow::Result<GuildChannel> {
        channel
            .to_channel(&self.http)
            .await
            .with_context(|| format!("failed to fetch channel {channel}"))?
            .guild()
            .with_context(|| format!("channel {channel} is not a guild channel"))
    }

    fn overwrites(&self, access: &AccessList) -> Vec<PermissionOverwrite> {
        let service = self.cache.current_user().id;
        access
            .into_iter()
            .map(|entry| overwrite(self.guild_id, service, entry))
            .collect()
    }

    fn render(&self, notice: Notice) -> CreateMessage {
        match notice {
            Notice::TicketOpened {
                number,
                requester,
                support_role,
            } => {
                let mut content = user(requester).mention().to_string();
                if let Some(role) = support_role {
                    content.push(' ');
                    content.push_str(&RoleId::new(role.0).mention().to_string());
                }
                let embed = CreateEmbed::new()
                    .title(format!("{} #{}", self.service_name, self.padded(number)))
                    .description("Please describe your issue. Support will be with you shortly.")
                    .colour(Colour::DARK_GREEN);
                let close = CreateButton::new(CLOSE_TICKET_BUTTON)
                    .label("Close & Archive")
                    .style(ButtonStyle::Danger)
                    .emoji('🔒');
                CreateMessage::new()
                    .content(content)
                    .embed(embed)
                    .components(vec![CreateActionRow::Buttons(vec![close])])
            }
            Notice::IntroductionFallback { number, reason } => CreateMessage::new().content(format!(
                "Ticket #{} created, but I couldn't load the menu. Error: {reason}",
                self.padded(number)
            )),
            Notice::TicketClosed => CreateMessage::new().embed(
                CreateEmbed::new()
                    .description("🔒 **Ticket Closed and Archived.**")
                    .colour(Colour::RED),
            ),
            Notice::DisconnectCompleted { subject } => CreateMessage::new().content(format!(
                "✅ **{}** has been disconnected (Timer Reached).",
                user(subject).mention()
            )),
        }
    }

    fn padded(&self, number: TicketNumber) -> String {
        number.padded(self.number_width)
    }
}

fn user(subject: SubjectId) -> UserId {
    UserId::new(subject.0)
}

fn permissions(set: Permissions) -> serenity::all::Permissions {
    let mut bits = serenity::all::Permissions::empty();
    if set.view {
        bits |= serenity::all::Permissions::VIEW_CHANNEL;
    }
    if set.send {
        bits |= serenity::all::Permissions::SEND_MESSAGES;
    }
    if set.embed_links {
        bits |= serenity::all::Permissions::EMBED_LINKS;
    }
    if set.attach_files {
        bits |= serenity::all::Permissions::ATTACH_FILES;
    }
    bits
}

fn overwrite(guild_id: GuildId, service: UserId, entry: &AccessEntry) -> PermissionOverwrite {
    let kind = match entry.principal {
        // The @everyone role shares the guild's ID.
        Principal::Everyone => PermissionOverwriteType::Role(RoleId::new(guild_id.get())),
        Principal::Service => PermissionOverwriteType::Member(service),
        Principal::Subject(subject) => PermissionOverwriteType::Member(user(subject)),
        Principal::Role(role) => PermissionOverwriteType::Role(RoleId::new(role.0)),
    };
    PermissionOverwrite {
        allow: permissions(entry.allow),
        deny: permissions(entry.deny),
        kind,
    }
}

fn summary(channel: &GuildChannel) -> ContainerSummary {
    ContainerSummary {
        id: ContainerRef(channel.id.get()),
        name: channel.name.clone(),
        group: channel.parent_id.map(|parent| GroupRef(parent.get())),
    }
}

impl Platform for DiscordPlatform {
    fn name(&self) -> &str {
        "discord"
    }

    async fn find_group_by_name(&self, name: &str) -> anyhow::Result<Option<GroupRef>> {
        Ok(self
            .guild_channels()
            .await?
            .into_iter()
            .find(|channel| channel.kind == ChannelType::Category && channel.name == name)
            .map(|channel| GroupRef(channel.id.get())))
    }

    async fn create_group(&self, name: &str, access: &AccessList) -> anyhow::Result<GroupRef> {
        let builder = CreateChannel::new(name)
            .kind(ChannelType::Category)
            .permissions(self.overwrites(access));
        let category = self
            .guild_id
            .create_channel(&self.http, builder)
            .await
            .with_context(|| format!("failed to create category {name}"))?;
        Ok(GroupRef(category.id.get()))
    }

    async fn list_containers(&self, group: GroupRef) -> anyhow::Result<Vec<ContainerSummary>> {
        let parent = ChannelId::new(group.0);
        Ok(self
            .guild_channels()
            .await?
            .iter()
            .filter(|channel| channel.parent_id == Some(parent))
            .map(summary)
            .collect())
    }

    async fn container_info(&self, container: ContainerRef) -> anyhow::Result<ContainerSummary> {
        let channel = self.guild_channel(ChannelId::new(container.0)).await?;
        Ok(summary(&channel))
    }

    async fn create_container(
        &self,
        group: GroupRef,
        name: &str,
        access: &AccessList,
    ) -> anyhow::Result<ContainerRef> {
        let builder = CreateChannel::new(name)
            .kind(ChannelType::Text)
            .category(ChannelId::new(group.0))
            .permissions(self.overwrites(access));
        let channel = self
            .guild_id
            .create_channel(&self.http, builder)
            .await
            .with_context(|| format!("failed to create channel {name}"))?;
        Ok(ContainerRef(channel.id.get()))
    }

    async fn move_container(
        &self,
        container: ContainerRef,
        group: GroupRef,
        sync_access: bool,
    ) -> anyhow::Result<()> {
        let category = ChannelId::new(group.0);
        let mut builder = EditChannel::new().category(category);
        if sync_access {
            let parent = self.guild_channel(category).await?;
            builder = builder.permissions(parent.permission_overwrites);
        }
        ChannelId::new(container.0)
            .edit(&self.http, builder)
            .await
            .with_context(|| format!("failed to move channel {container}"))?;
        Ok(())
    }

    async fn post_message(&self, container: ContainerRef, notice: Notice) -> anyhow::Result<()> {
        let message = self.render(notice);
        ChannelId::new(container.0)
            .send_message(&self.http, message)
            .await
            .with_context(|| format!("failed to post in channel {container}"))?;
        Ok(())
    }

    async fn disconnect_from_voice(&self, subject: SubjectId) -> anyhow::Result<bool> {
        let user_id = user(subject);
        if !self.is_in_voice(user_id) {
            return Ok(false);
        }
        self.guild_id
            .disconnect_member(&self.http, user_id)
            .await
            .with_context(|| format!("failed to disconnect member {user_id}"))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_sets_map_to_discord_bits() {
        let bits = permissions(Permissions::ELEVATED);
        assert!(bits.view_channel());
        assert!(bits.send_messages());
        assert!(bits.embed_links());
        assert!(bits.attach_files());

        assert_eq!(permissions(Permissions::NONE), serenity::all::Permissions::empty());
        assert_eq!(permissions(Permissions::VIEW), serenity::all::Permissions::VIEW_CHANNEL);
    }

    #[test]
    fn everyone_maps_to_the_guild_role() {
        let guild_id = GuildId::new(1234);
        let service = UserId::new(55);
        let entry = AccessEntry::deny(Principal::Everyone, Permissions::VIEW);

        let overwrite = overwrite(guild_id, service, &entry);

        assert_eq!(overwrite.kind, PermissionOverwriteType::Role(RoleId::new(1234)));
        assert_eq!(overwrite.deny, serenity::all::Permissions::VIEW_CHANNEL);
        assert!(overwrite.allow.is_empty());
    }

    #[test]
    fn service_and_subjects_map_to_members() {
        let guild_id = GuildId::new(1234);
        let service = UserId::new(55);

        let own = overwrite(
            guild_id,
            service,
            &AccessEntry::allow(Principal::Service, Permissions::ELEVATED),
        );
        let requester = overwrite(
            guild_id,
            service,
            &AccessEntry::allow(Principal::Subject(SubjectId(77)), Permissions::READ_WRITE),
        );

        assert_eq!(own.kind, PermissionOverwriteType::Member(service));
        assert_eq!(requester.kind, PermissionOverwriteType::Member(UserId::new(77)));
        assert!(!requester.allow.embed_links());
    }
}
