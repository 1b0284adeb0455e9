//! Static descriptions of known audit action codes.
//!
//! Two vendors share the export format: HSM partitions log `LUNA_*` operation
//! codes, the data platform logs plain-English operation names. Unknown codes
//! have no description.

/// HSM partition operation codes, sorted by code.
const HSM_ACTIONS: &[(&str, &str)] = &[
    ("LUNA_CANCEL_CRYPTO_OPERATION", "Cancels the crypto operation"),
    ("LUNA_CLONE_AS_SOURCE", "Clones an object from the source token"),
    ("LUNA_CLONE_AS_TARGET", "Clones an object to the target token"),
    ("LUNA_CLONE_AS_TARGET_INIT", "Initializes cloning an object to the target token"),
    ("LUNA_CLONE_CONFIGURE_POLICY", "Enables and disables cloning cipher suites"),
    ("LUNA_CLONE_GET_POLICY", "Used to query the status and the names of all cloning cipher suites"),
    ("LUNA_CREATE_OBJECT", "Creates an object"),
    ("LUNA_DECRYPT", "Decrypts encrypted data"),
    ("LUNA_DECRYPT_END", "Finishes a decryption operation"),
    ("LUNA_DECRYPT_INIT", "Initializes a decryption operation"),
    ("LUNA_DECRYPT_SINGLEPART", "Decrypts encrypted single-part data"),
    ("LUNA_DERIVE_KEY", "Derives a key from a base key"),
    ("LUNA_DERIVE_KEY_AND_WRAP", "Derives a key from a base key and wraps (encrypt) the key"),
    ("LUNA_DESTROY_OBJECT", "Destroys an object"),
    ("LUNA_DIGEST", "Digests single-part data"),
    ("LUNA_DIGEST_END", "Finishes a multiple-part digesting operation"),
    ("LUNA_DIGEST_INIT", "Initializes a message-digesting operation"),
    ("LUNA_DIGEST_KEY", "Digests a key"),
    ("LUNA_DIGEST_KEY_VALUE", "Digests a key value"),
    ("LUNA_ENCRYPT", "Encrypts data"),
    ("LUNA_ENCRYPT_END", "Finishes a multiple-part encryption operation"),
    ("LUNA_ENCRYPT_INIT", "Initializes a multiple-part encryption operation"),
    ("LUNA_ENCRYPT_SINGLEPART", "Encrypts single-part data"),
    ("LUNA_GENERATE_DOMAIN_PARAM", "Generated domain parameters"),
    ("LUNA_GENERATE_KEY", "Generates a secret key"),
    ("LUNA_GENERATE_KEY_PAIR", "Generates a public-key/private-key pair"),
    ("LUNA_GEN_KCV", "Generate a key check sum value"),
    ("LUNA_INIT_PIN", "Initializes the users PIN"),
    ("LUNA_LOGIN", "Logs in to a token"),
    ("LUNA_MODIFY_OBJECT", "Updates an object"),
    ("LUNA_PARTITION_INIT", "Initializes the HSM partition"),
    ("LUNA_PARTITION_ZEROIZE", "Zeroize the HSM partition"),
    ("LUNA_REPLICATE_AS_SOURCE", "Replicate an object from the source token"),
    ("LUNA_REPLICATE_AS_TARGET", "Replicate an object to the target token"),
    ("LUNA_REPLICATE_AS_TARGET_INIT", "Initializes replicating an object to the target token"),
    ("LUNA_SET_PIN", "Modifies the PIN of the current user"),
    ("LUNA_SIGN", "Signs data"),
    ("LUNA_SIGN_END", "Finishes a multi-part sign operation"),
    ("LUNA_SIGN_INIT", "Initializes a multi-part sign operation"),
    ("LUNA_SIGN_SINGLEPART", "Signs single-part data"),
    ("LUNA_UNWRAP_KEY", "Unwraps a key"),
    ("LUNA_VERIFY", "Verifies a signature on data"),
    ("LUNA_VERIFY_END", "Finishes a multi-part verification operation"),
    ("LUNA_VERIFY_INIT", "Initializes a multi-part verification operation"),
    ("LUNA_VERIFY_SINGLEPART", "Verifies a signature on single-part data"),
    ("LUNA_WRAP_KEY", "Wraps a key"),
];

/// Data platform operation names, sorted by name.
const DATA_PLATFORM_ACTIONS: &[(&str, &str)] = &[
    ("Add HSM Server", "Adds HSM server to configuration"),
    ("Add SNMP Community", "Adds SNMP community configuration"),
    ("Add SNMP Management Station", "Adds SNMP management station"),
    ("Add SNMP User", "Adds SNMP user configuration"),
    ("Add User to Group", "Adds a user to a group"),
    ("Change Password", "Changes user password"),
    ("Create Alert", "Creates a new alert"),
    ("Create Audit Log", "Creates an audit log entry"),
    ("Create Backup", "Creates a backup of data"),
    ("Create CA", "Creates a new Certificate Authority"),
    ("Create CSR", "Creates a Certificate Signing Request"),
    ("Create CTE KeyMeta", "Creates CTE key metadata"),
    ("Create CTE KeyRule", "Creates a new CTE key rule"),
    ("Create CTE LDTRule", "Creates a new CTE LDT (Logical Data Type) rule"),
    ("Create CTE Policy", "Creates a new CTE policy"),
    ("Create CTE PolicyAuditRecord", "Creates a CTE policy audit record"),
    ("Create CTE SecurityRule", "Creates a new CTE security rule"),
    ("Create Certificate", "Creates a new certificate"),
    ("Create Connection", "Creates a connection to external service"),
    ("Create Event", "Creates a new event"),
    ("Create Group", "Creates a new group"),
    ("Create Key", "Creates a new cryptographic key"),
    ("Create Key Version", "Creates a new version of an existing key"),
    ("Create Permission", "Creates a new permission"),
    ("Create Policy", "Creates a new access policy"),
    ("Create Role", "Creates a new user role"),
    ("Create Rule", "Creates a new rule"),
    ("Create Secret", "Creates a new secret"),
    ("Create Snapshot", "Creates a snapshot of current state"),
    ("Create Token", "Creates a new authentication token"),
    ("Create User", "Creates a new user account"),
    ("Create Vault", "Creates a new vault"),
    ("Create connection", "Establishes a new connection to the service"),
    ("CreateKmip ClientProfile", "Creates KMIP client profile"),
    ("CreateKmipClient Profile", "Creates KMIP client profile"),
    ("CreateKmipClient RegistrationToken", "Creates KMIP client registration token"),
    ("Decrypt", "Decrypts data using a key"),
    ("Delete Alert", "Deletes an alert"),
    ("Delete CA", "Deletes a Certificate Authority"),
    ("Delete CTE Policy", "Deletes a CTE policy"),
    ("Delete Certificate", "Deletes a certificate"),
    ("Delete Event", "Deletes an event"),
    ("Delete Group", "Deletes a group"),
    ("Delete HSM Server", "Removes HSM server from configuration"),
    ("Delete Key", "Deletes a cryptographic key"),
    ("Delete Key Version", "Deletes a specific version of a key"),
    ("Delete Permission", "Deletes a permission"),
    ("Delete Policy", "Deletes a policy"),
    ("Delete Role", "Deletes a user role"),
    ("Delete Rule", "Deletes a rule"),
    ("Delete Secret", "Deletes a secret"),
    ("Delete Snapshot", "Deletes a snapshot"),
    ("Delete User", "Deletes a user account"),
    ("Delete Vault", "Deletes a vault"),
    ("Destroy Key", "Destroys a key permanently"),
    ("Encrypt", "Encrypts data using a key"),
    ("Export Key", "Exports a key from the service"),
    ("Find HSM Servers", "Searches for HSM servers"),
    ("Find Key", "Searches for a specific key"),
    ("Find Keys", "Searches for keys matching criteria"),
    ("Generate Key", "Generates a new cryptographic key"),
    ("Get Audit Logs", "Retrieves audit log entries"),
    ("Get HSM Server", "Retrieves HSM server information"),
    ("Get Key", "Retrieves key information"),
    ("Get Secret", "Retrieves secret value"),
    ("Grant Permission", "Grants a permission to a user/role"),
    ("Import Key", "Imports a key into the service"),
    ("List Keys", "Lists available keys"),
    ("List Secrets", "Lists available secrets"),
    ("Login", "User authentication/login"),
    ("Logout", "User logout"),
    ("Read Key", "Reads key information"),
    ("RegisterKmipClient", "Registers a KMIP client"),
    ("Remove User from Group", "Removes a user from a group"),
    ("Reset Password", "Resets user password"),
    ("Restore Backup", "Restores data from backup"),
    ("Revoke Certificate", "Revokes a certificate"),
    ("Revoke Permission", "Revokes a permission from a user/role"),
    ("Rotate Key", "Rotates a key to a new version"),
    ("Setup HSM Server", "Sets up HSM server configuration"),
    ("Sign", "Signs data using a key"),
    ("Sign CSR", "Signs a Certificate Signing Request"),
    ("Terminating KMIP Connection", "Terminates KMIP connection"),
    ("Test Connection", "Tests connectivity to external service"),
    ("Unwrap Key", "Unwraps (decrypts) an imported key"),
    ("Update Alert", "Updates an alert"),
    ("Update CA", "Updates Certificate Authority properties"),
    ("Update CTE Policy", "Updates an existing CTE policy"),
    ("Update CTE PolicyXML", "Updates CTE policy XML configuration"),
    ("Update Certificate", "Updates certificate properties"),
    ("Update Event", "Updates an event"),
    ("Update Group", "Updates group properties"),
    ("Update Key", "Updates key properties"),
    ("Update Permission", "Updates a permission"),
    ("Update Policy", "Updates an existing policy"),
    ("Update Role", "Updates an existing role"),
    ("Update Rule", "Updates a rule"),
    ("Update SNMP Community", "Updates SNMP community settings"),
    ("Update Secret", "Updates secret properties"),
    ("Update User", "Updates user information or permissions"),
    ("Update Vault", "Updates vault properties"),
    ("Use Key", "Uses a key for cryptographic operations"),
    ("Verify", "Verifies a signature"),
    ("Versions", "Lists key versions"),
    ("Wrap Key", "Wraps (encrypts) a key for export"),
];

fn lookup(table: &'static [(&'static str, &'static str)], action: &str) -> Option<&'static str> {
    table
        .binary_search_by(|(code, _)| (*code).cmp(action))
        .ok()
        .map(|idx| table[idx].1)
}

/// Human description of an action code, if it is a known one.
pub fn describe(action: &str) -> Option<&'static str> {
    lookup(HSM_ACTIONS, action).or_else(|| lookup(DATA_PLATFORM_ACTIONS, action))
}
