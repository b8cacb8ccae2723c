//! Integration tests for protocol serialization

use chrono::Utc;
use std::num::NonZeroU32;
use studygroup::backend::{AttendeeChange, AuthToken, SessionQuery, SessionUpdate};
use studygroup::protocol::{
    check_version_compatibility, deserialize, frame_message, serialize, ClientMessage, ErrorKind,
    ServerMessage, MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};
use studygroup::server::connection::read_message;
use studygroup::session::{Location, NewSession, Session, SessionFields, SessionId, UserId};

fn fields() -> SessionFields {
    SessionFields {
        subject: "CSE3MAD".to_string(),
        subject_name: "Mobile Application Development".to_string(),
        location: Location::LearningCommons,
        date: "12/12/2025".to_string(),
        time: "05:00 PM".to_string(),
        description: String::new(),
        attendee_limit: NonZeroU32::new(4),
    }
}

#[test]
fn test_client_message_roundtrip() {
    let token = AuthToken::new("token-1");
    let messages = vec![
        ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
        },
        ClientMessage::SignUp {
            email: "ada@uni.edu".to_string(),
            password: "secret".to_string(),
        },
        ClientMessage::AddSession {
            token: token.clone(),
            session: NewSession {
                fields: fields(),
                host_name: "Ada".to_string(),
                created_by: UserId::new("u1"),
            },
        },
        ClientMessage::QuerySessions {
            token: token.clone(),
            query: SessionQuery::all()
                .attended_by(UserId::new("u1"))
                .newest_first()
                .limit(3),
        },
        ClientMessage::UpdateSession {
            token: token.clone(),
            id: SessionId::new("s1"),
            update: SessionUpdate::attendees(AttendeeChange::Remove(UserId::new("u1"))),
        },
        ClientMessage::UpdateSession {
            token,
            id: SessionId::new("s1"),
            update: SessionUpdate::fields(fields()),
        },
    ];

    for msg in messages {
        let encoded = serialize(&msg).expect("serialize failed");
        let decoded: ClientMessage = deserialize(&encoded).expect("deserialize failed");

        // Compare debug representations since ClientMessage doesn't derive PartialEq
        assert_eq!(format!("{:?}", msg), format!("{:?}", decoded));
    }
}

#[test]
fn test_server_message_roundtrip() {
    let session = Session::from_new(
        SessionId::new("s1"),
        NewSession {
            fields: fields(),
            host_name: String::new(),
            created_by: UserId::new("u1"),
        },
        Utc::now(),
    );
    let messages = vec![
        ServerMessage::Sessions {
            sessions: vec![session.clone()],
        },
        ServerMessage::Session { session: None },
        ServerMessage::Error {
            kind: ErrorKind::PermissionDenied,
            message: "Only the host can change this session".to_string(),
        },
    ];

    for msg in messages {
        let encoded = serialize(&msg).expect("serialize failed");
        let decoded: ServerMessage = deserialize(&encoded).expect("deserialize failed");
        assert_eq!(format!("{:?}", msg), format!("{:?}", decoded));
    }
}

#[tokio::test]
async fn test_framed_stream_of_messages() {
    let first = serialize(&ClientMessage::Hello {
        protocol_version: PROTOCOL_VERSION,
    })
    .unwrap();
    let second = serialize(&ClientMessage::SignOut {
        token: AuthToken::new("t"),
    })
    .unwrap();

    let mut stream = frame_message(&first).unwrap();
    stream.extend(frame_message(&second).unwrap());

    let mut reader = &stream[..];
    assert_eq!(read_message(&mut reader).await.unwrap(), Some(first));
    assert_eq!(read_message(&mut reader).await.unwrap(), Some(second));
    assert_eq!(read_message(&mut reader).await.unwrap(), None);
}

#[test]
fn test_oversized_reply_is_not_framed() {
    let sessions = vec![Session::from_new(
        SessionId::new("big"),
        NewSession {
            fields: SessionFields {
                description: "x".repeat(MAX_MESSAGE_SIZE as usize),
                ..fields()
            },
            host_name: "Ada".to_string(),
            created_by: UserId::new("ada"),
        },
        Utc::now(),
    )];
    let payload = serialize(&ServerMessage::Sessions { sessions }).unwrap();

    let err = frame_message(&payload).unwrap_err();
    assert!(err.to_string().contains("too large"));
}

#[test]
fn test_version_mismatch_rejected() {
    assert!(check_version_compatibility(PROTOCOL_VERSION, PROTOCOL_VERSION).is_ok());
    assert!(check_version_compatibility(PROTOCOL_VERSION, PROTOCOL_VERSION + 1).is_err());
}
