use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chat_warden::directory::{Directory, DirectoryResult};
use chat_warden::enforcement::{
    EnforcementEngine, InboundMessage, MembershipChange, MembershipEvent, ModerationStore,
    MuteExpiry,
};
use chat_warden::ids::{ChatId, MessageId, PeerId, UserId};
use chrono::Utc;

/// A directory that narrates every remote call instead of talking to VK.
struct ConsoleDirectory;

#[async_trait]
impl Directory for ConsoleDirectory {
    async fn send_message(&self, peer: PeerId, text: &str) -> DirectoryResult<()> {
        println!("  [send]    peer {peer}: {text}");
        Ok(())
    }

    async fn delete_messages(
        &self,
        peer: PeerId,
        message_ids: Vec<MessageId>,
    ) -> DirectoryResult<()> {
        println!("  [delete]  peer {peer}: messages {message_ids:?}");
        Ok(())
    }

    async fn remove_chat_user(&self, chat: ChatId, user: UserId) -> DirectoryResult<()> {
        println!("  [remove]  chat {chat}: user id{user}");
        Ok(())
    }

    async fn is_chat_admin(&self, chat: ChatId, user: UserId) -> DirectoryResult<bool> {
        println!("  [admin?]  chat {chat}: user id{user} -> false");
        Ok(false)
    }

    async fn resolve_screen_name(&self, name: &str) -> DirectoryResult<Option<UserId>> {
        println!("  [resolve] @{name} -> id42");
        Ok(Some(UserId(42)))
    }
}

fn message(peer: PeerId, from: UserId, text: &str) -> InboundMessage {
    InboundMessage {
        peer,
        from,
        text: text.to_string(),
        message_id: None,
    }
}

#[tokio::main]
async fn main() {
    println!("Moderation Lifecycle Test");
    println!("-------------------------");

    let store = ModerationStore::open_in_memory().expect("in-memory store");
    let owner = UserId(100);
    let engine = EnforcementEngine::new(store.clone(), Arc::new(ConsoleDirectory), owner);

    // Two group chats; peers above the conversation base map to chat ids
    let chat_a = PeerId(2_000_000_001);
    let chat_b = PeerId(2_000_000_002);

    // 1. Ordinary traffic registers the chats as they are seen
    println!("\n--- Plain Traffic ---");
    engine.handle_message(message(chat_a, UserId(42), "hello")).await;
    engine.handle_message(message(chat_b, UserId(8), "hi all")).await;
    println!("Known chats: {:?}", store.chats().await.expect("chats"));

    // 2. The owner mutes @bob in chat A, no duration = indefinite
    println!("\n--- Indefinite Mute ---");
    engine.handle_message(message(chat_a, owner, "/muta @bob")).await;
    println!(
        "Mute row for id42 in chat 1: {:?}",
        store.mute_expiry(ChatId(1), UserId(42)).await.expect("row")
    );

    // 3. The muted user speaks; the message is deleted and announced
    println!("\n--- Suppression ---");
    engine
        .handle_message(InboundMessage {
            peer: chat_a,
            from: UserId(42),
            text: "am I muted?".to_string(),
            message_id: Some(MessageId(999)),
        })
        .await;

    // 4. The owner lifts the mute; the user can speak again
    println!("\n--- Unmute ---");
    engine.handle_message(message(chat_a, owner, "/unmuta id42")).await;
    engine.handle_message(message(chat_a, UserId(42), "back again")).await;

    // 5. A short timed mute placed directly in the store, then traffic
    //    anywhere sweeps it once the clock passes the expiry
    println!("\n--- Timed Mute Expiry ---");
    store
        .set_muted(
            ChatId(1),
            UserId(55),
            MuteExpiry::At(Utc::now() + chrono::Duration::seconds(2)),
        )
        .await
        .expect("mute");
    println!("Muted id55 in chat 1 for ~2 seconds, sleeping past the expiry");
    tokio::time::sleep(Duration::from_secs(3)).await;
    engine.handle_message(message(chat_b, UserId(8), "any message sweeps")).await;

    // 6. A ban removes the target from every known chat and records it
    println!("\n--- Ban ---");
    engine.handle_message(message(chat_a, owner, "/ban id42")).await;
    println!(
        "Banned: {}, reason: {:?}",
        store.is_banned(UserId(42)).await.expect("banned"),
        store.ban_reason(UserId(42)).await.expect("reason")
    );

    // 7. Leaving one chat means leaving the network: the origin chat is
    //    skipped, every other known chat gets a removal
    println!("\n--- Membership Autokick ---");
    engine
        .handle_membership_event(MembershipEvent {
            peer: chat_b,
            change: MembershipChange::Left,
            user: UserId(77),
            actor: None,
        })
        .await;

    println!("\nModeration lifecycle test completed successfully!");
}
